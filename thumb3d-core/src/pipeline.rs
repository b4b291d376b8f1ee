/// The render pipeline shared by every host: fetch, parse, assemble,
/// normalize, frame, rasterize, encode.
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::config::RenderConfig;
use crate::encode;
use crate::error::{LoadError, RenderError, Result};
use crate::loader::{self, FileType};
use crate::material::Color;
use crate::normalize::normalize;
use crate::projection::Camera;
use crate::raster::Rasterizer;
use crate::scene::{LightRig, Model, Scene};
use crate::source::ModelSource;

pub const DEFAULT_COLOR: &str = "#808080";
pub const DEFAULT_SIZE: u32 = 400;
/// Upper bound on supersampled pixels per render (`width * height * supersample²`)
pub const MAX_SURFACE_SAMPLES: u64 = 1 << 24;

/// Input contract: `{ url, fileType, color, width, height }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub url: String,
    pub file_type: String,
    pub color: String,
    pub width: u32,
    pub height: u32,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>, file_type: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_type: file_type.into(),
            color: color.into(),
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Check the tags and dimensions, returning the parsed type and color.
    ///
    /// The supersampled surface must stay within [`MAX_SURFACE_SAMPLES`].
    pub fn validate(&self, config: &RenderConfig) -> Result<(FileType, Color)> {
        let file_type = self
            .file_type
            .parse::<FileType>()
            .map_err(RenderError::InvalidRequest)?;
        let color = self
            .color
            .parse::<Color>()
            .map_err(RenderError::InvalidRequest)?;
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidRequest(format!(
                "thumbnail size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        let samples = u64::from(config.supersample.max(1));
        let surface = u64::from(self.width)
            .checked_mul(u64::from(self.height))
            .and_then(|pixels| pixels.checked_mul(samples * samples));
        if !surface.is_some_and(|n| n <= MAX_SURFACE_SAMPLES) {
            return Err(RenderError::InvalidRequest(format!(
                "thumbnail size {}x{} at {}x supersampling exceeds {} samples",
                self.width, self.height, samples, MAX_SURFACE_SAMPLES
            )));
        }
        Ok((file_type, color))
    }
}

/// A finished thumbnail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Receives download progress in percent
pub trait ProgressSink {
    fn progress(&mut self, percent: f32);
}

impl<F: FnMut(f32)> ProgressSink for F {
    fn progress(&mut self, percent: f32) {
        self(percent)
    }
}

/// Turns byte counts into percentages that never decrease and stay within
/// `0..=100`. Unknown totals produce nothing.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<f32>,
}

impl ProgressTracker {
    pub fn update(&mut self, loaded: u64, total: Option<u64>) -> Option<f32> {
        let total = total.filter(|&t| t > 0)?;
        let percent = ((loaded as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32;
        if self.last.is_some_and(|last| percent < last) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }
}

/// Run the whole pipeline for `request` on the calling thread.
///
/// Progress is delivered through `progress`; the outcome is the return
/// value. `cancel` is polled between stages and download chunks, and a
/// cancelled render returns [`RenderError::Cancelled`].
pub fn render_thumbnail(
    request: &RenderRequest,
    config: &RenderConfig,
    source: &dyn ModelSource,
    progress: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<Thumbnail> {
    let (file_type, color) = request.validate(config)?;
    log::info!(
        "rendering {} ({}) at {}x{} in {}",
        request.url,
        file_type,
        request.width,
        request.height,
        color
    );

    let mut tracker = ProgressTracker::default();
    let bytes = source
        .fetch(
            &request.url,
            &mut |loaded, total| {
                if let Some(percent) = tracker.update(loaded, total) {
                    progress.progress(percent);
                }
            },
            cancel,
        )
        .inspect_err(|e| {
            if !matches!(e, LoadError::Cancelled) {
                log::warn!("failed to fetch {}: {e}", request.url);
            }
        })?;
    cancel.check()?;

    let loaded = loader::parse_model(file_type, &bytes)
        .inspect_err(|e| log::warn!("failed to parse {}: {e}", request.url))?;
    drop(bytes);
    log::debug!("parsed {} triangles", loaded.triangle_count());
    cancel.check()?;

    let mut model = Model::from_loaded(loaded, color);
    normalize(&mut model)?;
    let scene = Scene::new(LightRig::studio(config), model);
    let camera = Camera::thumbnail();
    cancel.check()?;

    let image = Rasterizer::new(request.width, request.height, config).render(&scene, &camera, cancel)?;
    drop(scene);
    log::debug!("rasterized {}x{} frame", image.width(), image.height());

    let png = encode::encode_png(&image)?;
    let data_url = encode::png_data_url(&png);
    cancel.check()?;

    log::info!("rendered {} ({} byte PNG)", request.url, png.len());
    Ok(Thumbnail {
        data_url,
        width: request.width,
        height: request.height,
    })
}
