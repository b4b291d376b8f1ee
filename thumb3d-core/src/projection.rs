/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3};

/// Thumbnail framing constants
pub const THUMBNAIL_FOV_DEGREES: f32 = 45.0;
const FRAMING_DISTANCE: f32 = 1.7;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// A vertex after projection: pixel position, NDC depth and `1 / w`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    pub inv_w: f32,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    /// Fixed three-quarter view of a unit-sized model at the origin, Z up.
    ///
    /// The aspect is always 1 regardless of the output size.
    pub fn thumbnail() -> Self {
        let fov = THUMBNAIL_FOV_DEGREES.to_radians();
        let distance = thumbnail_distance(fov);
        let angle = std::f32::consts::FRAC_PI_4;

        Self {
            position: Point3::new(
                -angle.cos() * distance,
                -angle.cos() * distance,
                angle.sin() * distance * 0.5,
            ),
            target: Point3::origin(),
            up: Vector3::z(),
            fov,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    /// Orthographic camera looking at the origin from `direction`, used to
    /// render shadow maps. The view volume spans `2 * half_extent` on each
    /// side.
    pub fn light_view(direction: &Vector3<f32>, half_extent: f32) -> Self {
        let direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
        // Up must not be parallel to the view direction
        let up = if direction.z.abs() > 0.99 {
            Vector3::y()
        } else {
            Vector3::z()
        };
        // The orthographic volume is sized from the eye distance
        let distance = 2.0 * half_extent;

        Self {
            position: Point3::from(direction * distance),
            target: Point3::origin(),
            up,
            fov: std::f32::consts::PI / 4.0,
            aspect: 1.0,
            near: 0.01,
            far: distance * 4.0,
            mode: ProjectionMode::Orthographic,
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world-space point through `mvp` to pixel coordinates.
    ///
    /// Returns `None` for points behind the near plane.
    pub fn project(
        &self,
        mvp: &Matrix4<f32>,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<ScreenVertex> {
        let clip = mvp * point.to_homogeneous();

        // Prevent division by near-zero depth values
        if clip.w < 1e-6 {
            return None;
        }

        let inv_w = 1.0 / clip.w;
        let ndc_x = clip.x * inv_w;
        let ndc_y = clip.y * inv_w;
        let depth = clip.z * inv_w;

        if depth < -1.0 {
            return None;
        }

        // Convert to screen space
        Some(ScreenVertex {
            x: (ndc_x + 1.0) * 0.5 * width as f32,
            y: (1.0 - ndc_y) * 0.5 * height as f32,
            depth,
            inv_w,
        })
    }
}

/// Distance that frames a unit model for the given vertical field of view
pub fn thumbnail_distance(fov: f32) -> f32 {
    FRAMING_DISTANCE.min(FRAMING_DISTANCE / (fov / 2.0).tan())
}

impl Default for Camera {
    fn default() -> Self {
        Self::thumbnail()
    }
}
