/// Centering and unit scaling of the model
use crate::bounds::Aabb;
use crate::error::RenderError;
use crate::scene::Model;
use crate::transform::ModelTransform;

/// Transform that maps `bounds` to a box centered on the origin whose
/// largest side is 1.
///
/// An empty box or one with no extent is rejected instead of producing a
/// non-finite scale.
pub fn normalizing_transform(bounds: &Aabb) -> Result<ModelTransform, RenderError> {
    let max_dim = bounds.max_dimension();
    if bounds.is_empty() || !max_dim.is_finite() || max_dim <= 0.0 {
        return Err(RenderError::DegenerateModel(max_dim));
    }

    let scale = 1.0 / max_dim;
    if !scale.is_finite() {
        return Err(RenderError::DegenerateModel(max_dim));
    }
    Ok(ModelTransform {
        scale,
        translation: -bounds.center().coords * scale,
    })
}

/// Re-center and rescale `model` in place
pub fn normalize(model: &mut Model) -> Result<(), RenderError> {
    let bounds = model.local_bounds();
    let transform = normalizing_transform(&bounds)?;
    log::debug!(
        "normalizing model: size {:?}, center {:?}, scale {}",
        bounds.size().as_slice(),
        bounds.center().coords.as_slice(),
        transform.scale
    );
    model.transform = transform;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, Triangle, Vertex};
    use crate::loader::LoadedModel;
    use crate::material::Color;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn model_from(mesh: Mesh) -> Model {
        Model::from_loaded(LoadedModel::Geometry(mesh), Color::WHITE)
    }

    #[test]
    fn test_unit_size_and_centered() {
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(
            Vertex::at(Point3::new(10.0, 20.0, 30.0)),
            Vertex::at(Point3::new(14.0, 20.0, 30.0)),
            Vertex::at(Point3::new(10.0, 22.0, 31.0)),
        ));
        let mut model = model_from(mesh);
        normalize(&mut model).unwrap();

        let bounds = model.world_bounds();
        assert_relative_eq!(bounds.max_dimension(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.center(), Point3::origin(), epsilon = 1e-5);
        assert_relative_eq!(model.transform.scale, 0.25);
    }

    #[test]
    fn test_various_sizes_reach_unit_dimension() {
        for size in [0.001f32, 1.0, 10.0, 2500.0] {
            let mut model = model_from(Mesh::cube(size));
            normalize(&mut model).unwrap();
            assert_relative_eq!(model.world_bounds().max_dimension(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_tiny_model_is_not_degenerate() {
        let mut model = model_from(Mesh::cube(1e-7));
        normalize(&mut model).unwrap();
        assert_relative_eq!(model.transform.scale, 1e7, max_relative = 1e-4);
        assert_relative_eq!(model.world_bounds().max_dimension(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_subnormal_extent_is_rejected() {
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(
            Vertex::at(Point3::new(0.0, 0.0, 0.0)),
            Vertex::at(Point3::new(1e-40, 0.0, 0.0)),
            Vertex::at(Point3::new(0.0, 1e-40, 0.0)),
        ));
        let err = normalize(&mut model_from(mesh)).unwrap_err();
        assert!(matches!(err, RenderError::DegenerateModel(_)));
    }

    #[test]
    fn test_flat_model_still_normalizes() {
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(
            Vertex::at(Point3::new(0.0, 0.0, 0.0)),
            Vertex::at(Point3::new(2.0, 0.0, 0.0)),
            Vertex::at(Point3::new(0.0, 2.0, 0.0)),
        ));
        let mut model = model_from(mesh);
        normalize(&mut model).unwrap();
        assert_relative_eq!(model.world_bounds().size().z, 0.0);
    }

    #[test]
    fn test_zero_extent_is_rejected() {
        let p = Vertex::at(Point3::new(1.0, 1.0, 1.0));
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(p, p, p));
        let err = normalize(&mut model_from(mesh)).unwrap_err();
        assert!(matches!(err, RenderError::DegenerateModel(d) if d == 0.0));
    }

    #[test]
    fn test_empty_bounds_are_rejected() {
        assert!(normalizing_transform(&Aabb::empty()).is_err());
    }
}
