/// Host-side state holder that drives background renders for a UI
use std::sync::Arc;
use std::time::Duration;

use flume::RecvTimeoutError;

use crate::config::RenderConfig;
use crate::loader::FileType;
use crate::pipeline::{RenderRequest, DEFAULT_COLOR, DEFAULT_SIZE};
use crate::source::{ModelSource, UrlSource};
use crate::worker::{spawn_render, RenderEvent, RenderHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterState {
    Idle,
    Downloading { progress: f32 },
    Complete { data: String },
    Error { message: String },
}

/// What a UI binds to: `{ data, loading, error, progress }`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThumbnailView {
    pub data: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub progress: Option<f32>,
}

/// Parameters that trigger a new render when they change
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParamsKey {
    url: Option<String>,
    file_type: Option<String>,
    color: String,
}

/// Runs at most one background render at a time and folds its events into
/// an [`AdapterState`].
///
/// Changing parameters or tearing down cancels the active render and drops
/// its channel, so a superseded render can never update the state.
pub struct ThumbnailAdapter {
    config: RenderConfig,
    source: Arc<dyn ModelSource>,
    width: u32,
    height: u32,
    state: AdapterState,
    params: Option<ParamsKey>,
    active: Option<RenderHandle>,
}

impl ThumbnailAdapter {
    pub fn new(config: RenderConfig) -> Self {
        let source = Arc::new(UrlSource::new(&config));
        Self::with_source(config, source)
    }

    pub fn with_source(config: RenderConfig, source: Arc<dyn ModelSource>) -> Self {
        Self {
            config,
            source,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            state: AdapterState::Idle,
            params: None,
            active: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn state(&self) -> &AdapterState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn view(&self) -> ThumbnailView {
        match &self.state {
            AdapterState::Idle => ThumbnailView::default(),
            AdapterState::Downloading { progress } => ThumbnailView {
                loading: true,
                progress: Some(*progress),
                ..Default::default()
            },
            AdapterState::Complete { data } => ThumbnailView {
                data: Some(data.clone()),
                progress: Some(100.0),
                ..Default::default()
            },
            AdapterState::Error { message } => ThumbnailView {
                error: Some(message.clone()),
                ..Default::default()
            },
        }
    }

    /// Update the render parameters.
    ///
    /// Unchanged parameters are a no-op. Otherwise the active render is
    /// cancelled, and a new one starts when a URL and a supported file type
    /// are present; if not, the adapter returns to idle. `color` defaults
    /// to `#808080`.
    pub fn set_params(&mut self, url: Option<&str>, file_type: Option<&str>, color: Option<&str>) {
        let key = ParamsKey {
            url: url.map(str::to_string),
            file_type: file_type.map(str::to_string),
            color: color.unwrap_or(DEFAULT_COLOR).to_string(),
        };
        if self.params.as_ref() == Some(&key) {
            return;
        }

        self.cancel_active();
        self.state = AdapterState::Idle;

        let request = match (&key.url, &key.file_type) {
            (Some(url), Some(tag)) if !url.is_empty() && tag.parse::<FileType>().is_ok() => Some(
                RenderRequest::new(url.as_str(), tag.as_str(), key.color.as_str())
                    .with_size(self.width, self.height),
            ),
            _ => None,
        };
        let Some(request) = request else {
            log::debug!("not rendering: url {:?}, file type {:?}", key.url, key.file_type);
            self.params = Some(key);
            return;
        };
        self.params = Some(key);

        match spawn_render(request, self.config.clone(), Arc::clone(&self.source)) {
            Ok(handle) => {
                self.active = Some(handle);
                self.state = AdapterState::Downloading { progress: 0.0 };
            }
            Err(e) => {
                log::error!("failed to start render thread: {e}");
                self.state = AdapterState::Error {
                    message: format!("failed to start render: {e}"),
                };
            }
        }
    }

    /// Apply every event already delivered. Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Some(handle) = &self.active {
            match handle.events().try_recv() {
                Ok(event) => {
                    self.apply(event);
                    changed = true;
                }
                Err(flume::TryRecvError::Empty) => break,
                Err(flume::TryRecvError::Disconnected) => {
                    self.worker_vanished();
                    changed = true;
                }
            }
        }
        changed
    }

    /// Like [`poll`](Self::poll) but waits up to `timeout` for the first event
    pub fn poll_timeout(&mut self, timeout: Duration) -> bool {
        let Some(events) = self.active.as_ref().map(|h| h.events().clone()) else {
            return false;
        };
        match events.recv_timeout(timeout) {
            Ok(event) => {
                self.apply(event);
                self.poll();
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.worker_vanished();
                true
            }
        }
    }

    /// Cancel any active render and forget the parameters
    pub fn teardown(&mut self) {
        self.cancel_active();
        self.params = None;
        self.state = AdapterState::Idle;
    }

    fn apply(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::Progress { progress } => {
                if let AdapterState::Downloading { .. } = self.state {
                    self.state = AdapterState::Downloading { progress };
                }
            }
            RenderEvent::Complete { image_data } => {
                self.state = AdapterState::Complete { data: image_data };
                self.finish_active();
            }
            RenderEvent::Error { error } => {
                self.state = AdapterState::Error { message: error };
                self.finish_active();
            }
        }
    }

    fn worker_vanished(&mut self) {
        self.finish_active();
        self.state = AdapterState::Error {
            message: "render worker exited without a result".to_string(),
        };
    }

    fn finish_active(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.join();
        }
    }

    fn cancel_active(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
            // Dropping the handle drops the receiver; the thread exits on its own
        }
    }
}

impl Drop for ThumbnailAdapter {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_shapes() {
        let mut adapter = ThumbnailAdapter::new(RenderConfig::default());
        assert_eq!(adapter.view(), ThumbnailView::default());

        adapter.state = AdapterState::Downloading { progress: 42.0 };
        let view = adapter.view();
        assert!(view.loading);
        assert_eq!(view.progress, Some(42.0));
        assert_eq!(view.data, None);

        adapter.state = AdapterState::Error {
            message: "boom".into(),
        };
        assert_eq!(adapter.view().error.as_deref(), Some("boom"));
        assert!(!adapter.view().loading);
    }

    #[test]
    fn test_unsupported_type_stays_idle() {
        let mut adapter = ThumbnailAdapter::new(RenderConfig::default());
        adapter.set_params(Some("model.ply"), Some("ply"), None);
        assert_eq!(adapter.state(), &AdapterState::Idle);
        assert!(!adapter.is_active());
        assert!(!adapter.poll());
    }

    #[test]
    fn test_missing_url_stays_idle() {
        let mut adapter = ThumbnailAdapter::new(RenderConfig::default());
        adapter.set_params(None, Some("stl"), Some("#ff0000"));
        assert_eq!(adapter.state(), &AdapterState::Idle);
        assert!(!adapter.is_active());
    }
}
