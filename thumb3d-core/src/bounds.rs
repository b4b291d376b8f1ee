use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned bounding box. Starts inverted so the first point defines it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn new(point1: Point3<f32>, point2: Point3<f32>) -> Self {
        Self {
            min: point1.inf(&point2),
            max: point1.sup(&point2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: &Point3<f32>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max()
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Bounds of this box after an affine transform
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for corner in self.corners() {
            out.extend(&matrix.transform_point(&corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_has_no_size() {
        let bounds = Aabb::empty();
        assert!(bounds.is_empty());
        assert_eq!(bounds.max_dimension(), 0.0);
    }

    #[test]
    fn test_extend_and_center() {
        let mut bounds = Aabb::empty();
        bounds.extend(&Point3::new(1.0, 2.0, 3.0));
        bounds.extend(&Point3::new(3.0, -2.0, 4.0));
        assert_relative_eq!(bounds.center(), Point3::new(2.0, 0.0, 3.5));
        assert_relative_eq!(bounds.size(), Vector3::new(2.0, 4.0, 1.0));
        assert_relative_eq!(bounds.max_dimension(), 4.0);
    }

    #[test]
    fn test_transform_scales_and_moves() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let matrix = Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)) * Matrix4::new_scaling(2.0);
        let moved = bounds.transform(&matrix);
        assert_relative_eq!(moved.min, Point3::new(-1.0, -2.0, -2.0));
        assert_relative_eq!(moved.max, Point3::new(3.0, 2.0, 2.0));
    }
}
