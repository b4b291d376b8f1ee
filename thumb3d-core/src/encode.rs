/// PNG export and data URL encoding for rendered frames
use base64::Engine as _;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error::RenderError;

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a tightly packed RGBA frame as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut png = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut png, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)?;
    Ok(png)
}

/// Wrap PNG bytes in a `data:image/png;base64,` URL
pub fn png_data_url(png: &[u8]) -> String {
    let mut url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + png.len() * 4 / 3 + 4);
    url.push_str(PNG_DATA_URL_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(png, &mut url);
    url
}

/// Decode the PNG bytes back out of a data URL produced by [`png_data_url`]
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, RenderError> {
    let payload = url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| RenderError::Encode("not a PNG data URL".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| RenderError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_data_url_holds_png() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 128]));
        let url = png_data_url(&encode_png(&image).unwrap());
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));

        let decoded = image::load_from_memory(&decode_data_url(&url).unwrap())
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_rejects_foreign_data_url() {
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
    }
}
