/// Depth maps for directional lights with percentage-closer filtering
use nalgebra::{Matrix4, Point3, Vector3};

use crate::projection::Camera;
use crate::raster::rasterize_triangle;
use crate::scene::{Model, ShadowSettings};

/// Half-size of the light's view volume; covers a normalized model
const LIGHT_VOLUME_HALF_EXTENT: f32 = 1.0;
/// Cap on the slope factor so grazing angles don't blow up the bias
const MAX_SLOPE: f32 = 10.0;

pub struct ShadowMap {
    camera: Camera,
    view_projection: Matrix4<f32>,
    size: usize,
    depth: Vec<f32>,
    bias: f32,
}

impl ShadowMap {
    /// Render the depth of `model` as seen from a light shining from `direction`
    pub fn render(direction: &Vector3<f32>, settings: &ShadowSettings, model: &Model) -> Self {
        let camera = Camera::light_view(direction, LIGHT_VOLUME_HALF_EXTENT);
        let view_projection = camera.view_projection();
        let size = settings.map_size.max(1) as usize;
        let mut depth = vec![f32::INFINITY; size * size];

        for node in &model.nodes {
            for triangle in &node.mesh.triangles {
                let mut screen = Vec::with_capacity(3);
                for vertex in &triangle.vertices {
                    let world = model.transform.apply(&vertex.position);
                    if let Some(projected) = camera.project(&view_projection, &world, size as u32, size as u32) {
                        screen.push(projected);
                    }
                }
                let Ok(screen) = <[_; 3]>::try_from(screen) else {
                    continue;
                };

                rasterize_triangle(size, size, &screen, |x, y, w| {
                    let z = w[0] * screen[0].depth + w[1] * screen[1].depth + w[2] * screen[2].depth;
                    let texel = &mut depth[y * size + x];
                    if z < *texel {
                        *texel = z;
                    }
                });
            }
        }

        Self {
            camera,
            view_projection,
            size,
            depth,
            bias: settings.bias,
        }
    }

    /// Fraction of the `(2r + 1)²` neighbourhood around `position` that the
    /// light reaches. Points outside the map are fully lit.
    pub fn visibility(&self, position: &Point3<f32>, n_dot_l: f32, pcf_radius: u32) -> f32 {
        let size = self.size as u32;
        let Some(p) = self.camera.project(&self.view_projection, position, size, size) else {
            return 1.0;
        };

        let n_dot_l = n_dot_l.clamp(1e-3, 1.0);
        let slope = ((1.0 - n_dot_l * n_dot_l).sqrt() / n_dot_l).min(MAX_SLOPE);
        let reference = p.depth - self.bias * (1.0 + 2.0 * slope);

        let cx = p.x.floor() as i64;
        let cy = p.y.floor() as i64;
        let r = pcf_radius as i64;
        let mut lit = 0u32;
        let mut total = 0u32;

        for dy in -r..=r {
            for dx in -r..=r {
                let (x, y) = (cx + dx, cy + dy);
                total += 1;
                if x < 0 || y < 0 || x >= self.size as i64 || y >= self.size as i64 {
                    lit += 1;
                    continue;
                }
                if reference <= self.depth[y as usize * self.size + x as usize] {
                    lit += 1;
                }
            }
        }

        lit as f32 / total as f32
    }
}
