/// Scene assembly: the fixed light rig and the single thumbnailed model
use nalgebra::{Matrix4, Point3, Vector3};

use crate::bounds::Aabb;
use crate::config::RenderConfig;
use crate::geometry::Mesh;
use crate::loader::LoadedModel;
use crate::material::{Color, Material};
use crate::transform::ModelTransform;

/// Shadow map parameters for a shadow-casting light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub bias: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Vector3<f32>,
        intensity: f32,
    },
    /// Parallel light shining from `position` towards the origin
    Directional {
        color: Vector3<f32>,
        intensity: f32,
        position: Point3<f32>,
        shadow: Option<ShadowSettings>,
    },
    /// Sky/ground gradient keyed on the surface normal's Y component
    Hemisphere {
        sky: Vector3<f32>,
        ground: Vector3<f32>,
        intensity: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub lights: Vec<Light>,
}

impl LightRig {
    /// Ambient fill, key/fill/rim directionals and a hemisphere light
    pub fn studio(config: &RenderConfig) -> Self {
        let white = Color::WHITE.to_linear();
        let main = ShadowSettings {
            map_size: config.shadow_map_size,
            bias: config.shadow_bias,
        };
        let secondary = ShadowSettings {
            map_size: (config.shadow_map_size / 2).max(1),
            ..main
        };

        Self {
            lights: vec![
                Light::Ambient {
                    color: white,
                    intensity: 0.8,
                },
                Light::Directional {
                    color: white,
                    intensity: 1.5,
                    position: Point3::new(3.0, 3.0, 5.0),
                    shadow: Some(main),
                },
                Light::Directional {
                    color: white,
                    intensity: 0.8,
                    position: Point3::new(-3.0, 0.0, 3.0),
                    shadow: Some(secondary),
                },
                Light::Directional {
                    color: white,
                    intensity: 0.6,
                    position: Point3::new(0.0, -3.0, -2.0),
                    shadow: Some(secondary),
                },
                Light::Hemisphere {
                    sky: white,
                    ground: Color::from_hex(0x444444).to_linear(),
                    intensity: 0.6,
                },
            ],
        }
    }
}

/// A mesh together with its own material instance
#[derive(Debug, Clone)]
pub struct MeshNode {
    pub name: String,
    pub mesh: Mesh,
    pub material: Material,
}

/// The model inserted into the scene
#[derive(Debug, Clone)]
pub struct Model {
    pub nodes: Vec<MeshNode>,
    pub transform: ModelTransform,
}

impl Model {
    /// Wrap parser output, giving each mesh node a freshly built material
    pub fn from_loaded(loaded: LoadedModel, color: Color) -> Self {
        let nodes = match loaded {
            LoadedModel::Geometry(mesh) => vec![MeshNode {
                name: "geometry".to_string(),
                mesh,
                material: Material::matte(color),
            }],
            LoadedModel::Hierarchy(obj) => obj
                .nodes
                .into_iter()
                .map(|node| MeshNode {
                    name: node.name,
                    mesh: node.mesh,
                    material: Material::matte(color),
                })
                .collect(),
        };

        Self {
            nodes,
            transform: ModelTransform::identity(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|node| node.mesh.len()).sum()
    }

    /// Bounds of the untransformed geometry
    pub fn local_bounds(&self) -> Aabb {
        self.nodes
            .iter()
            .fold(Aabb::empty(), |bounds, node| bounds.union(&node.mesh.bounds()))
    }

    /// Bounds after the model transform
    pub fn world_bounds(&self) -> Aabb {
        self.local_bounds().transform(&self.world_matrix())
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.transform.matrix()
    }
}

/// Lights plus one model, alive for a single render
#[derive(Debug, Clone)]
pub struct Scene {
    pub lights: LightRig,
    pub model: Model,
}

impl Scene {
    pub fn new(lights: LightRig, model: Model) -> Self {
        Self { lights, model }
    }
}
