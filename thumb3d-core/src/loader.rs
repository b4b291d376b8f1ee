/// Parser selection by declared file type
use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::obj::{self, ObjModel};
use crate::stl;

/// Model formats that can be thumbnailed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Obj,
    Stl,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Obj => "obj",
            FileType::Stl => "stl",
        }
    }

    /// Guess the type from a path or URL extension, ignoring any query string
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let (_, extension) = path.rsplit_once('.')?;
        extension.parse().ok()
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "obj" => Ok(FileType::Obj),
            "stl" => Ok(FileType::Stl),
            other => Err(format!("unsupported file type: {other:?}")),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a format parser
#[derive(Debug, Clone)]
pub enum LoadedModel {
    /// Raw triangle buffer (STL)
    Geometry(Mesh),
    /// Node hierarchy (OBJ)
    Hierarchy(ObjModel),
}

impl LoadedModel {
    pub fn triangle_count(&self) -> usize {
        match self {
            LoadedModel::Geometry(mesh) => mesh.len(),
            LoadedModel::Hierarchy(model) => model.triangle_count(),
        }
    }
}

/// Parse downloaded bytes with the parser for `file_type`
pub fn parse_model(file_type: FileType, data: &[u8]) -> Result<LoadedModel, LoadError> {
    match file_type {
        FileType::Stl => stl::parse_stl(data).map(LoadedModel::Geometry),
        FileType::Obj => obj::parse_obj(data).map(LoadedModel::Hierarchy),
    }
}
