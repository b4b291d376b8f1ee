/// Software rasterizer rendering a scene into an offscreen RGBA surface
use std::f32::consts::PI;

use image::{Rgba, RgbaImage};
use nalgebra::{Point3, Vector3};

use crate::cancel::CancellationToken;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::geometry::Triangle;
use crate::material::{linear_to_srgb, Material};
use crate::projection::{Camera, ScreenVertex};
use crate::scene::{Light, Scene};
use crate::shadow::ShadowMap;

/// Offscreen color and depth surface, supersampled by `samples` per axis
pub struct Rasterizer {
    width: u32,
    height: u32,
    samples: u32,
    pcf_radius: u32,
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
}

impl Rasterizer {
    pub fn new(width: u32, height: u32, config: &RenderConfig) -> Self {
        let samples = config.supersample.max(1);
        let size = (width as usize * samples as usize) * (height as usize * samples as usize);
        Self {
            width,
            height,
            samples,
            pcf_radius: config.pcf_radius,
            color: vec![[0.0; 4]; size],
            depth: vec![f32::INFINITY; size],
        }
    }

    fn surface_size(&self) -> (usize, usize) {
        (
            self.width as usize * self.samples as usize,
            self.height as usize * self.samples as usize,
        )
    }

    /// Reset to a transparent background
    pub fn clear(&mut self) {
        self.color.fill([0.0; 4]);
        self.depth.fill(f32::INFINITY);
    }

    /// Render one frame of `scene` seen from `camera`
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, RenderError> {
        self.clear();

        let mut shadows = Vec::with_capacity(scene.lights.lights.len());
        for light in &scene.lights.lights {
            cancel.check()?;
            shadows.push(match light {
                Light::Directional {
                    position,
                    shadow: Some(settings),
                    ..
                } => Some(ShadowMap::render(&position.coords, settings, &scene.model)),
                _ => None,
            });
        }

        let (width, height) = self.surface_size();
        let view_projection = camera.view_projection();
        let transform = scene.model.transform;
        let lights = &scene.lights.lights;
        let pcf_radius = self.pcf_radius;

        for node in &scene.model.nodes {
            cancel.check()?;
            for triangle in &node.mesh.triangles {
                let world = Triangle {
                    vertices: triangle.vertices.map(|mut v| {
                        v.position = transform.apply(&v.position);
                        v
                    }),
                };
                let Some(face_normal) = world.calculate_normal() else {
                    continue;
                };

                let mut screen = [ScreenVertex {
                    x: 0.0,
                    y: 0.0,
                    depth: 0.0,
                    inv_w: 0.0,
                }; 3];
                let mut visible = true;
                for (out, vertex) in screen.iter_mut().zip(&world.vertices) {
                    match camera.project(&view_projection, &vertex.position, width as u32, height as u32) {
                        Some(projected) => *out = projected,
                        None => visible = false,
                    }
                }
                if !visible {
                    continue;
                }

                let material = &node.material;
                let color = &mut self.color;
                let depth_buffer = &mut self.depth;
                rasterize_triangle(width, height, &screen, |x, y, weights| {
                    let depth = weights[0] * screen[0].depth
                        + weights[1] * screen[1].depth
                        + weights[2] * screen[2].depth;
                    let idx = y * width + x;
                    if depth >= depth_buffer[idx] {
                        return;
                    }

                    let position = perspective_interpolate(&world, &screen, weights);
                    let normal = surface_normal(&world, &screen, weights, material, &face_normal);
                    let view_dir = (camera.position - position)
                        .try_normalize(f32::EPSILON)
                        .unwrap_or_else(Vector3::z);
                    // Two-sided: light whichever side faces the camera
                    let normal = if normal.dot(&view_dir) < 0.0 { -normal } else { normal };

                    let rgb = shade(lights, &shadows, material, &normal, &position, &view_dir, pcf_radius);
                    depth_buffer[idx] = depth;
                    color[idx] = [rgb.x, rgb.y, rgb.z, 1.0];
                });
            }
        }

        Ok(self.resolve())
    }

    /// Box-filter the supersampled surface down to the output size
    fn resolve(&self) -> RgbaImage {
        let samples = self.samples as usize;
        let (surface_width, _) = self.surface_size();
        let count = (samples * samples) as f32;

        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let mut premultiplied = [0.0f32; 3];
            let mut alpha = 0.0f32;
            for sy in 0..samples {
                for sx in 0..samples {
                    let idx = (y as usize * samples + sy) * surface_width + x as usize * samples + sx;
                    let [r, g, b, a] = self.color[idx];
                    premultiplied[0] += r * a;
                    premultiplied[1] += g * a;
                    premultiplied[2] += b * a;
                    alpha += a;
                }
            }
            if alpha <= 0.0 {
                return Rgba([0, 0, 0, 0]);
            }
            let channel = |c: f32| (linear_to_srgb(c / alpha) * 255.0).round() as u8;
            Rgba([
                channel(premultiplied[0]),
                channel(premultiplied[1]),
                channel(premultiplied[2]),
                ((alpha / count) * 255.0).round() as u8,
            ])
        })
    }
}

impl Drop for Rasterizer {
    fn drop(&mut self) {
        log::trace!("released {}x{} surface", self.width, self.height);
    }
}

/// Visit every pixel whose center lies inside the projected triangle,
/// passing its barycentric weights
pub(crate) fn rasterize_triangle<F>(width: usize, height: usize, coords: &[ScreenVertex; 3], mut visit: F)
where
    F: FnMut(usize, usize, [f32; 3]),
{
    let [v0, v1, v2] = coords;
    if coords.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
        return;
    }

    // Bounding box
    let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0);
    let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(width as f32 - 1.0);
    let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0);
    let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(height as f32 - 1.0);
    if min_x > max_x || min_y > max_y {
        return;
    }

    for y in min_y as usize..=max_y as usize {
        for x in min_x as usize..=max_x as usize {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            if let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py)) {
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    visit(x, y, [w0, w1, w2]);
                }
            }
        }
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

/// Screen-space weights corrected for perspective
fn perspective_weights(screen: &[ScreenVertex; 3], weights: [f32; 3]) -> [f32; 3] {
    let w = [
        weights[0] * screen[0].inv_w,
        weights[1] * screen[1].inv_w,
        weights[2] * screen[2].inv_w,
    ];
    let sum = w[0] + w[1] + w[2];
    if sum.abs() < f32::EPSILON {
        return weights;
    }
    [w[0] / sum, w[1] / sum, w[2] / sum]
}

fn perspective_interpolate(world: &Triangle, screen: &[ScreenVertex; 3], weights: [f32; 3]) -> Point3<f32> {
    let w = perspective_weights(screen, weights);
    Point3::from(
        world.vertices[0].position.coords * w[0]
            + world.vertices[1].position.coords * w[1]
            + world.vertices[2].position.coords * w[2],
    )
}

/// Face normal for flat materials, interpolated vertex normals otherwise
fn surface_normal(
    world: &Triangle,
    screen: &[ScreenVertex; 3],
    weights: [f32; 3],
    material: &Material,
    face_normal: &Vector3<f32>,
) -> Vector3<f32> {
    if material.flat_shading {
        return *face_normal;
    }
    let w = perspective_weights(screen, weights);
    let interpolated = world.vertices[0].normal * w[0]
        + world.vertices[1].normal * w[1]
        + world.vertices[2].normal * w[2];
    interpolated
        .try_normalize(f32::EPSILON)
        .unwrap_or(*face_normal)
}

/// Blinn-Phong exponent approximating a GGX roughness
fn roughness_to_shininess(roughness: f32) -> f32 {
    let alpha = (roughness * roughness).max(1e-3);
    (2.0 / (alpha * alpha) - 2.0).max(1.0)
}

/// Linear-light radiance leaving a surface point towards the camera
fn shade(
    lights: &[Light],
    shadows: &[Option<ShadowMap>],
    material: &Material,
    normal: &Vector3<f32>,
    position: &Point3<f32>,
    view_dir: &Vector3<f32>,
    pcf_radius: u32,
) -> Vector3<f32> {
    let mut irradiance = Vector3::zeros();
    let mut specular = Vector3::zeros();
    let shininess = roughness_to_shininess(material.roughness);

    for (light, shadow) in lights.iter().zip(shadows) {
        match light {
            Light::Ambient { color, intensity } => irradiance += color * *intensity,
            Light::Hemisphere {
                sky,
                ground,
                intensity,
            } => {
                // The hemisphere axis is +Y even though the camera is Z-up
                let t = 0.5 * normal.y + 0.5;
                irradiance += ground.lerp(sky, t) * *intensity;
            }
            Light::Directional {
                color,
                intensity,
                position: light_position,
                ..
            } => {
                let Some(to_light) = light_position.coords.try_normalize(f32::EPSILON) else {
                    continue;
                };
                let n_dot_l = normal.dot(&to_light);
                if n_dot_l <= 0.0 {
                    continue;
                }
                let visibility = shadow
                    .as_ref()
                    .map_or(1.0, |map| map.visibility(position, n_dot_l, pcf_radius));
                let radiance = color * (*intensity * n_dot_l * visibility);
                irradiance += radiance;

                if let Some(half) = (to_light + view_dir).try_normalize(f32::EPSILON) {
                    let n_dot_h = normal.dot(&half).max(0.0);
                    specular += radiance * (n_dot_h.powf(shininess) * (shininess + 2.0) / (8.0 * PI));
                }
            }
        }
    }

    let diffuse_color = material.base_color * (1.0 - material.metalness);
    let f0 = Vector3::repeat(0.04).lerp(&material.base_color, material.metalness);
    diffuse_color.component_mul(&irradiance) / PI + f0.component_mul(&specular)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::loader::LoadedModel;
    use crate::material::Color;
    use crate::normalize::normalize;
    use crate::scene::{LightRig, Model};

    fn test_config() -> RenderConfig {
        RenderConfig::default()
            .with_supersample(1)
            .with_shadow_map_size(128)
    }

    fn cube_scene(color: &str) -> Scene {
        let config = test_config();
        let mut model = Model::from_loaded(LoadedModel::Geometry(Mesh::cube(3.0)), color.parse::<Color>().unwrap());
        normalize(&mut model).unwrap();
        Scene::new(LightRig::studio(&config), model)
    }

    #[test]
    fn test_barycentric_inside_and_outside() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-6);

        let (_, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (5.0, 5.0)).unwrap();
        assert!(w1 < 0.0 || w2 < 0.0 || w1 + w2 > 1.0);
    }

    #[test]
    fn test_rasterize_triangle_covers_half_square() {
        let v = |x: f32, y: f32| ScreenVertex { x, y, depth: 0.0, inv_w: 1.0 };
        let mut covered = 0;
        rasterize_triangle(8, 8, &[v(0.0, 0.0), v(8.0, 0.0), v(0.0, 8.0)], |_, _, _| covered += 1);
        assert!(covered >= 28 && covered <= 36, "covered {covered}");
    }

    #[test]
    fn test_offscreen_triangle_is_skipped() {
        let v = |x: f32, y: f32| ScreenVertex { x, y, depth: 0.0, inv_w: 1.0 };
        let mut covered = 0;
        rasterize_triangle(8, 8, &[v(-20.0, -20.0), v(-10.0, -20.0), v(-20.0, -10.0)], |_, _, _| covered += 1);
        assert_eq!(covered, 0);
    }

    #[test]
    fn test_cube_render_has_transparent_background() {
        let scene = cube_scene("#ff0000");
        let mut rasterizer = Rasterizer::new(64, 64, &test_config());
        let image = rasterizer
            .render(&scene, &Camera::thumbnail(), &CancellationToken::new())
            .unwrap();

        assert_eq!(image.dimensions(), (64, 64));
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        let center = image.get_pixel(32, 32);
        assert_eq!(center[3], 255);
        assert!(center[0] > center[1] && center[0] > center[2]);
    }

    #[test]
    fn test_hemisphere_blends_along_y() {
        let lights = [Light::Hemisphere {
            sky: Vector3::new(1.0, 1.0, 1.0),
            ground: Vector3::new(0.0, 0.0, 0.0),
            intensity: 1.0,
        }];
        let material = Material::matte(Color::WHITE);
        let shade_facing = |normal: Vector3<f32>| {
            shade(&lights, &[None], &material, &normal, &Point3::origin(), &normal, 0).x
        };

        let up = shade_facing(Vector3::y());
        let down = shade_facing(-Vector3::y());
        let side = shade_facing(Vector3::z());
        assert!(up > side && side > down, "up {up}, side {side}, down {down}");
        assert!(down.abs() < 1e-6);
        assert!((side - 0.5 / PI).abs() < 1e-5);
    }

    #[test]
    fn test_render_honours_cancellation() {
        let scene = cube_scene("#808080");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut rasterizer = Rasterizer::new(16, 16, &test_config());
        let result = rasterizer.render(&scene, &Camera::thumbnail(), &cancel);
        assert!(matches!(result, Err(RenderError::Cancelled)));
    }

    #[test]
    fn test_supersampled_edges_are_partially_transparent() {
        let scene = cube_scene("#ffffff");
        let config = test_config().with_supersample(4);
        let image = Rasterizer::new(32, 32, &config)
            .render(&scene, &Camera::thumbnail(), &CancellationToken::new())
            .unwrap();
        assert!(image.pixels().any(|p| p[3] > 0 && p[3] < 255));
    }
}
