/// Base colors and the matte surface material applied to every mesh
use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;

/// An sRGB color parsed from `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    pub const WHITE: Color = Color::from_hex(0xffffff);

    /// Linear-light RGB in `0.0..=1.0`
    pub fn to_linear(self) -> Vector3<f32> {
        Vector3::new(
            srgb_to_linear(self.r as f32 / 255.0),
            srgb_to_linear(self.g as f32 / 255.0),
            srgb_to_linear(self.b as f32 / 255.0),
        )
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| format!("expected a #RRGGBB color, got {s:?}"))?;
        u32::from_str_radix(hex, 16)
            .map(Color::from_hex)
            .map_err(|e| e.to_string())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Physically based surface parameters, one instance per mesh node
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Linear-light albedo
    pub base_color: Vector3<f32>,
    pub metalness: f32,
    pub roughness: f32,
    pub flat_shading: bool,
}

impl Material {
    /// Non-metallic, very rough, flat shaded
    pub fn matte(color: Color) -> Self {
        Self {
            base_color: color.to_linear(),
            metalness: 0.0,
            roughness: 0.9,
            flat_shading: true,
        }
    }
}
