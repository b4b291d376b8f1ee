/// Background render thread reporting over a message channel
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::pipeline::{render_thumbnail, RenderRequest};
use crate::source::ModelSource;

/// Messages sent from a background render, in order: zero or more
/// `Progress`, then exactly one `Complete` or `Error` unless cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderEvent {
    Progress {
        progress: f32,
    },
    Complete {
        #[serde(rename = "imageData")]
        image_data: String,
    },
    Error {
        error: String,
    },
}

impl RenderEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RenderEvent::Progress { .. })
    }
}

/// Owner side of a background render.
///
/// Dropping the handle cancels the render; the thread finishes its current
/// stage and exits without reporting.
pub struct RenderHandle {
    events: flume::Receiver<RenderEvent>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl RenderHandle {
    pub fn events(&self) -> &flume::Receiver<RenderEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the render thread to exit
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("render thread panicked");
            }
        }
    }
}

impl Drop for RenderHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}

/// Start rendering `request` on a new thread
pub fn spawn_render(
    request: RenderRequest,
    config: RenderConfig,
    source: Arc<dyn ModelSource>,
) -> std::io::Result<RenderHandle> {
    let (tx, rx) = flume::unbounded();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let thread = thread::Builder::new()
        .name("thumb3d-render".to_string())
        .spawn(move || run(&request, &config, source.as_ref(), &tx, &token))?;

    Ok(RenderHandle {
        events: rx,
        cancel,
        thread: Some(thread),
    })
}

fn run(
    request: &RenderRequest,
    config: &RenderConfig,
    source: &dyn ModelSource,
    tx: &flume::Sender<RenderEvent>,
    cancel: &CancellationToken,
) {
    let mut progress = |percent: f32| {
        if !cancel.is_cancelled() {
            // A dropped receiver means nobody is listening any more
            let _ = tx.send(RenderEvent::Progress { progress: percent });
        }
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        render_thumbnail(request, config, source, &mut progress, cancel)
    }));
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("render of {} panicked: {message}", request.url);
            let _ = tx.send(RenderEvent::Error {
                error: format!("render failed: {message}"),
            });
            return;
        }
    };
    if cancel.is_cancelled() {
        log::debug!("discarding result of cancelled render for {}", request.url);
        return;
    }

    let event = match outcome {
        Ok(thumbnail) => RenderEvent::Complete {
            image_data: thumbnail.data_url,
        },
        Err(RenderError::Cancelled) => return,
        Err(e) => RenderEvent::Error {
            error: e.to_string(),
        },
    };
    let _ = tx.send(event);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
