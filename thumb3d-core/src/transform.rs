/// Model placement: uniform scale followed by translation
use nalgebra::{Matrix4, Point3, Vector3};

/// Uniform scale then translation, the only transform a thumbnail needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub scale: f32,
    pub translation: Vector3<f32>,
}

impl ModelTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translation: Vector3::zeros(),
        }
    }

    /// Model matrix: `T * S`
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation) * Matrix4::new_scaling(self.scale)
    }

    pub fn apply(&self, point: &Point3<f32>) -> Point3<f32> {
        Point3::from(point.coords * self.scale + self.translation)
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_transform() {
        let matrix = ModelTransform::identity().matrix();
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_matrix_matches_apply() {
        let transform = ModelTransform {
            scale: 0.1,
            translation: Vector3::new(-0.5, 0.25, 1.0),
        };
        let point = Point3::new(3.0, -2.0, 10.0);
        assert_relative_eq!(
            transform.matrix().transform_point(&point),
            transform.apply(&point),
            epsilon = 1e-6
        );
        assert_relative_eq!(transform.apply(&point), Point3::new(-0.2, 0.05, 2.0), epsilon = 1e-6);
    }
}
