/// Wavefront OBJ parser producing one mesh per object or group
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::{tag, take_till1},
    character::complete::{i64 as integer, space0, space1},
    combinator::{opt, rest},
    multi::separated_list1,
    number::complete::float,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::LoadError;
use crate::geometry::{Mesh, Triangle, Vertex};

const DEFAULT_NODE: &str = "default";

/// A named mesh inside an OBJ hierarchy
#[derive(Debug, Clone)]
pub struct ObjNode {
    pub name: String,
    pub mesh: Mesh,
}

/// Parsed OBJ file: the nodes that carry at least one face
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    pub nodes: Vec<ObjNode>,
}

impl ObjModel {
    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|node| node.mesh.len()).sum()
    }
}

/// One corner of a face: position, texture and normal indices as written
type FaceVertex = (i64, Option<Option<i64>>, Option<Option<i64>>);

enum Statement<'a> {
    Position(f32, f32, f32),
    Normal(f32, f32, f32),
    Face(Vec<FaceVertex>),
    Node(&'a str),
    Ignored,
}

/// Parse an OBJ file
pub fn parse_obj(data: &[u8]) -> Result<ObjModel, LoadError> {
    let text = String::from_utf8_lossy(data);
    parse_obj_str(&text)
}

pub fn parse_obj_str(text: &str) -> Result<ObjModel, LoadError> {
    let mut positions: Vec<Point3<f32>> = Vec::new();
    let mut normals: Vec<Vector3<f32>> = Vec::new();
    let mut model = ObjModel::default();
    let mut current = ObjNode {
        name: DEFAULT_NODE.to_string(),
        mesh: Mesh::new(),
    };

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let statement = match statement(line) {
            Ok((_, statement)) => statement,
            Err(e) => {
                return Err(LoadError::parse(
                    "OBJ",
                    format!("line {line_number}: {e:?}"),
                ))
            }
        };

        match statement {
            Statement::Position(x, y, z) => positions.push(Point3::new(x, y, z)),
            Statement::Normal(x, y, z) => normals.push(Vector3::new(x, y, z)),
            Statement::Node(name) => {
                let name = if name.is_empty() { DEFAULT_NODE } else { name };
                if current.mesh.is_empty() {
                    current.name = name.to_string();
                } else {
                    let finished = std::mem::replace(
                        &mut current,
                        ObjNode {
                            name: name.to_string(),
                            mesh: Mesh::new(),
                        },
                    );
                    model.nodes.push(finished);
                }
            }
            Statement::Face(corners) => {
                if corners.len() < 3 {
                    return Err(LoadError::parse(
                        "OBJ",
                        format!("line {line_number}: face needs at least 3 vertices"),
                    ));
                }
                let vertices = corners
                    .iter()
                    .map(|corner| resolve_corner(corner, &positions, &normals))
                    .collect::<Result<Vec<_>, String>>()
                    .map_err(|message| {
                        LoadError::parse("OBJ", format!("line {line_number}: {message}"))
                    })?;

                // Fan triangulation for quads and n-gons
                for i in 1..vertices.len() - 1 {
                    current
                        .mesh
                        .add_triangle(Triangle::new(vertices[0], vertices[i], vertices[i + 1]));
                }
            }
            Statement::Ignored => {}
        }
    }

    if !current.mesh.is_empty() {
        model.nodes.push(current);
    }

    if model.nodes.is_empty() {
        return Err(LoadError::parse("OBJ", "file contains no faces"));
    }

    Ok(model)
}

fn resolve_corner(
    corner: &FaceVertex,
    positions: &[Point3<f32>],
    normals: &[Vector3<f32>],
) -> Result<Vertex, String> {
    let (position_index, _, normal_index) = corner;
    let position = resolve_index(*position_index, positions.len())
        .map(|i| positions[i])
        .ok_or_else(|| format!("vertex index {position_index} out of range"))?;

    let normal = match normal_index {
        Some(Some(n)) => resolve_index(*n, normals.len())
            .map(|i| normals[i])
            .ok_or_else(|| format!("normal index {n} out of range"))?,
        _ => Vector3::zeros(),
    };

    Ok(Vertex { position, normal })
}

/// OBJ indices are 1-based, negative values count back from the latest element
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = match index {
        0 => return None,
        i if i > 0 => i - 1,
        i => len + i,
    };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

fn statement(input: &str) -> IResult<&str, Statement<'_>> {
    let (input, keyword) = terminated(take_till1(|c: char| c.is_whitespace()), space0)(input)?;
    match keyword {
        "v" => {
            let (input, (x, y, z)) = vector3(input)?;
            // Optional w or vertex colors trail the position
            let (input, _) = rest(input)?;
            Ok((input, Statement::Position(x, y, z)))
        }
        "vn" => {
            let (input, (x, y, z)) = vector3(input)?;
            Ok((input, Statement::Normal(x, y, z)))
        }
        "f" => {
            let (input, corners) = separated_list1(space1, face_vertex)(input)?;
            Ok((input, Statement::Face(corners)))
        }
        "o" | "g" => {
            let (input, name) = rest(input)?;
            Ok((input, Statement::Node(name.trim())))
        }
        _ => Ok(("", Statement::Ignored)),
    }
}

fn vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    tuple((float, preceded(space1, float), preceded(space1, float)))(input)
}

fn face_vertex(input: &str) -> IResult<&str, FaceVertex> {
    tuple((
        integer,
        opt(preceded(tag("/"), opt(integer))),
        opt(preceded(tag("/"), opt(integer))),
    ))(input)
}
