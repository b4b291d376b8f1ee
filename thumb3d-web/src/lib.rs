/// thumb3d web - WASM bindings for the thumbnail renderer
///
/// The browser fetches the model bytes itself and hands them over; rendering
/// runs synchronously inside the call. Progress and the outcome are also
/// reported to an optional `onEvent` callback as `{ type, ... }` objects.
use js_sys::{Function, Object, Reflect};
use thumb3d_core::{render_thumbnail, CancellationToken, MemorySource, RenderConfig, RenderEvent, RenderRequest};
use wasm_bindgen::prelude::*;

const MODEL_URL: &str = "memory://model";

#[wasm_bindgen]
pub struct ThumbnailRenderer {
    config: RenderConfig,
}

#[wasm_bindgen]
impl ThumbnailRenderer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ThumbnailRenderer {
        ThumbnailRenderer {
            config: RenderConfig::default(),
        }
    }

    /// Supersampling factor per axis (at least 1)
    #[wasm_bindgen(js_name = setSupersample)]
    pub fn set_supersample(&mut self, factor: u32) {
        self.config = self.config.clone().with_supersample(factor);
    }

    /// Render `bytes` and return the PNG data URL, or throw the error message
    pub fn render(
        &self,
        bytes: Vec<u8>,
        file_type: &str,
        color: &str,
        width: u32,
        height: u32,
        on_event: Option<Function>,
    ) -> Result<String, JsValue> {
        let emit = |event: RenderEvent| {
            if let Some(callback) = &on_event {
                if let Err(e) = event_object(&event).and_then(|obj| callback.call1(&JsValue::NULL, &obj)) {
                    log::warn!("onEvent callback failed: {e:?}");
                }
            }
        };

        let outcome = render_bytes(&self.config, bytes, file_type, color, width, height, |progress| {
            emit(RenderEvent::Progress { progress })
        });
        match outcome {
            Ok(data_url) => {
                emit(RenderEvent::Complete {
                    image_data: data_url.clone(),
                });
                Ok(data_url)
            }
            Err(error) => {
                emit(RenderEvent::Error { error: error.clone() });
                Err(JsValue::from_str(&error))
            }
        }
    }
}

impl Default for ThumbnailRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the pipeline over in-memory bytes
pub fn render_bytes(
    config: &RenderConfig,
    bytes: Vec<u8>,
    file_type: &str,
    color: &str,
    width: u32,
    height: u32,
    mut on_progress: impl FnMut(f32),
) -> Result<String, String> {
    let source = MemorySource::new().with(MODEL_URL, bytes);
    let request = RenderRequest::new(MODEL_URL, file_type, color).with_size(width, height);
    render_thumbnail(&request, config, &source, &mut on_progress, &CancellationToken::new())
        .map(|thumbnail| thumbnail.data_url)
        .map_err(|e| e.to_string())
}

fn event_object(event: &RenderEvent) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    let set = |key: &str, value: JsValue| Reflect::set(&obj, &JsValue::from_str(key), &value).map(|_| ());
    match event {
        RenderEvent::Progress { progress } => {
            set("type", "progress".into())?;
            set("progress", JsValue::from_f64(*progress as f64))?;
        }
        RenderEvent::Complete { image_data } => {
            set("type", "complete".into())?;
            set("imageData", image_data.as_str().into())?;
        }
        RenderEvent::Error { error } => {
            set("type", "error".into())?;
            set("error", error.as_str().into())?;
        }
    }
    Ok(obj.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 1\nf 1 2 3\n";

    fn config() -> RenderConfig {
        RenderConfig::default()
            .with_supersample(1)
            .with_shadow_map_size(32)
    }

    #[test]
    fn test_render_bytes_reports_full_progress() {
        let mut reports = Vec::new();
        let data_url = render_bytes(&config(), TRIANGLE_OBJ.into(), "obj", "#ffcc00", 24, 24, |p| {
            reports.push(p)
        })
        .unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));
        assert_eq!(reports.last(), Some(&100.0));
    }

    #[test]
    fn test_render_bytes_error_is_a_message() {
        let err = render_bytes(&config(), b"nonsense".to_vec(), "stl", "#ffcc00", 24, 24, |_| {}).unwrap_err();
        assert!(err.contains("STL") || err.contains("stl"), "{err}");

        let err = render_bytes(&config(), TRIANGLE_OBJ.into(), "ply", "#ffcc00", 24, 24, |_| {}).unwrap_err();
        assert!(err.contains("ply"), "{err}");
    }
}
