/// Terminal host for the thumbnail renderer
use anyhow::{anyhow, Context, Result};
use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{self, Write};
use std::time::Duration;
use thumb3d_core::{AdapterState, RenderConfig, ThumbnailAdapter};

pub mod renderer;

pub use renderer::AsciiRenderer;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const BAR_WIDTH: usize = 30;

/// Parameters of one terminal render
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub url: String,
    pub file_type: String,
    pub color: String,
}

/// Drives a [`ThumbnailAdapter`] to completion, drawing progress on stderr
pub struct TerminalApp {
    adapter: ThumbnailAdapter,
    show_progress: bool,
    last_drawn: Option<u32>,
}

impl TerminalApp {
    pub fn new(config: RenderConfig, width: u32, height: u32) -> Self {
        Self {
            adapter: ThumbnailAdapter::new(config).with_size(width, height),
            show_progress: true,
            last_drawn: None,
        }
    }

    pub fn with_adapter(adapter: ThumbnailAdapter) -> Self {
        Self {
            adapter,
            show_progress: true,
            last_drawn: None,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Render `job` and return the PNG data URL
    pub fn run(&mut self, job: &RenderJob) -> Result<String> {
        self.adapter.set_params(
            Some(job.url.as_str()),
            Some(job.file_type.as_str()),
            Some(job.color.as_str()),
        );
        if !self.adapter.is_active() {
            return Err(anyhow!("nothing to render for {} ({})", job.url, job.file_type));
        }

        let outcome = self.main_loop();
        if self.show_progress {
            self.finish_progress()?;
        }
        outcome
    }

    fn main_loop(&mut self) -> Result<String> {
        loop {
            self.adapter.poll_timeout(POLL_INTERVAL);
            match self.adapter.state().clone() {
                AdapterState::Downloading { progress } => {
                    if self.show_progress {
                        self.draw_progress(progress)?;
                    }
                }
                AdapterState::Complete { data } => return Ok(data),
                AdapterState::Error { message } => return Err(anyhow!(message)),
                AdapterState::Idle => return Err(anyhow!("render stopped without a result")),
            }
        }
    }

    fn draw_progress(&mut self, progress: f32) -> io::Result<()> {
        let percent = progress.clamp(0.0, 100.0).round() as u32;
        if self.last_drawn == Some(percent) {
            return Ok(());
        }
        self.last_drawn = Some(percent);

        let filled = percent as usize * BAR_WIDTH / 100;
        let mut stderr = io::stderr();
        queue!(
            stderr,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Downloading [{}{}] {percent:>3}%",
                "#".repeat(filled),
                " ".repeat(BAR_WIDTH - filled)
            )),
            ResetColor
        )?;
        stderr.flush()
    }

    fn finish_progress(&mut self) -> io::Result<()> {
        if self.last_drawn.take().is_none() {
            return Ok(());
        }
        let mut stderr = io::stderr();
        queue!(
            stderr,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine)
        )?;
        stderr.flush()
    }
}

/// Decode a PNG data URL and print it as colored ASCII art
pub fn print_preview<W: Write>(data_url: &str, columns: usize, writer: &mut W) -> Result<()> {
    let png = thumb3d_core::encode::decode_data_url(data_url)?;
    let image = image::load_from_memory(&png)
        .context("thumbnail is not a readable PNG")?
        .to_rgba8();
    AsciiRenderer::fit(&image, columns).draw(writer)?;
    Ok(())
}

/// Preview width that fits the current terminal
pub fn preview_columns() -> usize {
    terminal::size()
        .map(|(width, _)| (width as usize).saturating_sub(1).clamp(8, 100))
        .unwrap_or(60)
}
