//! Parses Wavefront `.obj` geometry and groups its faces by material.
//!
//! Unlike the material parser this one is strict: a malformed number or index
//! aborts the parse with the offending line.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;

use crate::assets::mesh::{fan_triangle_count, fan_triangulate, BoundingBox};
use crate::assets::mtl::{Material, MaterialTable};
use crate::error::{MissingReference, ParseError};

/// Group that collects faces read while no material was active.
pub const DEFAULT_GROUP: &str = "default";

/// Marks a vertex no face assigned a texture coordinate to.
pub const UNSET_UV: [f32; 2] = [-1.0, -1.0];

/// A polygon as read from an `f` line, with 0-based indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Face {
    pub vertices: Vec<u32>,
    /// One entry per vertex, or `None` if any vertex of the face lacks one.
    pub uvs: Option<Vec<u32>>,
    /// One entry per vertex, or `None` if any vertex of the face lacks one.
    pub normals: Option<Vec<u32>>,
}

impl Face {
    pub fn triangle_count(&self) -> usize {
        fan_triangle_count(self.vertices.len())
    }
}

/// The faces of a model that share one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialGroup {
    pub name: String,
    /// Resolved from the material table, if one was given and had the name.
    pub material: Option<Material>,
    pub faces: Vec<Face>,
}

impl MaterialGroup {
    pub fn new(name: impl Into<String>) -> MaterialGroup {
        MaterialGroup {
            name: name.into(),
            material: None,
            faces: Vec::new(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(Face::triangle_count).sum()
    }

    /// Fan-triangulates every face into a triangle list.
    pub fn triangulate(&self) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.triangle_count() * 3);
        for face in &self.faces {
            fan_triangulate(&face.vertices, &mut indices);
        }
        indices
    }

    /// The resolved material, or the default one if the name did not resolve.
    pub fn material_or_default(&self) -> Cow<'_, Material> {
        match &self.material {
            Some(material) => Cow::Borrowed(material),
            None => Cow::Owned(Material::new(self.name.clone())),
        }
    }
}

/// Where one group's triangles live inside a shared index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRange {
    pub first_index: usize,
    pub index_count: usize,
}

/// A parsed model: per-vertex attribute arrays plus its faces partitioned
/// into material groups.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshWithMaterials {
    /// XYZ per vertex.
    pub positions: Vec<f32>,
    /// UV per vertex; [`UNSET_UV`] where no face assigned one.
    pub uvs: Vec<f32>,
    /// XYZ per vertex, present if the file had any `vn` lines.
    pub normals: Option<Vec<f32>>,
    /// In order of first use.
    pub groups: Vec<MaterialGroup>,
    /// The file named by the last `mtllib` line.
    pub material_library: Option<String>,
    /// Material names the given table could not resolve.
    pub missing_references: Vec<MissingReference>,
}

impl MeshWithMaterials {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.groups.iter().map(|group| group.faces.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.groups.iter().map(MaterialGroup::triangle_count).sum()
    }

    pub fn group(&self, name: &str) -> Option<&MaterialGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_positions(&self.positions)
    }

    /// Concatenates every group's triangles into one index buffer, returning
    /// the buffer and each group's range within it, in group order.
    pub fn build_index_buffer(&self) -> (Vec<u32>, Vec<GroupRange>) {
        let mut indices = Vec::with_capacity(self.triangle_count() * 3);
        let mut ranges = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let first_index = indices.len();
            for face in &group.faces {
                fan_triangulate(&face.vertices, &mut indices);
            }
            ranges.push(GroupRange {
                first_index,
                index_count: indices.len() - first_index,
            });
        }
        (indices, ranges)
    }
}

/// Parses `.obj` text. If `materials` is given, each group's material is
/// resolved against it; names it lacks are recorded as missing references.
pub fn parse<R: BufRead>(
    reader: R,
    materials: Option<&MaterialTable>,
) -> Result<MeshWithMaterials, ParseError> {
    let mut builder = ObjBuilder::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        builder.parse_line(i + 1, line.trim())?;
    }
    Ok(builder.build(materials))
}

/// Parses `.obj` text held in memory.
pub fn parse_str(
    text: &str,
    materials: Option<&MaterialTable>,
) -> Result<MeshWithMaterials, ParseError> {
    parse(text.as_bytes(), materials)
}

#[derive(Debug, Default)]
struct ObjBuilder {
    positions: Vec<[f32; 3]>,
    uv_table: Vec<[f32; 2]>,
    normal_table: Vec<[f32; 3]>,
    /// Every face in file order, tagged with its group.
    faces: Vec<(usize, Face)>,
    group_names: Vec<String>,
    group_lookup: HashMap<String, usize>,
    current_material: Option<String>,
    material_library: Option<String>,
}

impl ObjBuilder {
    fn parse_line(&mut self, line: usize, text: &str) -> Result<(), ParseError> {
        if text.is_empty() || text.starts_with('#') {
            return Ok(());
        }
        let (directive, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let rest = rest.trim();
        match directive {
            "v" => {
                let [x, y, z] = parse_floats::<3>(line, "v", rest, 3)?;
                self.positions.push([x, y, z]);
            }
            "vt" => {
                // The v component is optional and defaults to 0.
                let [u, v] = parse_floats::<2>(line, "vt", rest, 1)?;
                self.uv_table.push([u, v]);
            }
            "vn" => {
                let normal = parse_floats::<3>(line, "vn", rest, 3)?;
                self.normal_table.push(normal);
            }
            "f" => {
                let face = self.parse_face(line, rest)?;
                let group = self.current_group();
                self.faces.push((group, face));
            }
            "usemtl" => {
                if rest.is_empty() {
                    log::warn!("Line {line}: usemtl without a name, keeping the current material");
                } else {
                    self.current_material = Some(rest.to_string());
                }
            }
            "mtllib" => {
                if !rest.is_empty() {
                    self.material_library = Some(rest.to_string());
                }
            }
            // o, g, s, l and vp do not affect material grouping.
            _ => log::trace!("Line {line}: ignoring {directive}"),
        }
        Ok(())
    }

    fn current_group(&mut self) -> usize {
        let name = self.current_material.as_deref().unwrap_or(DEFAULT_GROUP);
        if let Some(&index) = self.group_lookup.get(name) {
            return index;
        }
        let index = self.group_names.len();
        self.group_names.push(name.to_string());
        self.group_lookup.insert(name.to_string(), index);
        index
    }

    fn parse_face(&self, line: usize, rest: &str) -> Result<Face, ParseError> {
        let mut face = Face::default();
        let mut uvs = Vec::new();
        let mut normals = Vec::new();
        let (mut has_uvs, mut has_normals) = (true, true);

        for corner in rest.split_whitespace() {
            let mut parts = corner.split('/');
            let vertex = parts.next().unwrap_or_default();
            if vertex.is_empty() {
                return Err(ParseError::InvalidIndex {
                    line,
                    token: corner.to_string(),
                });
            }
            face.vertices
                .push(resolve_index(line, vertex, self.positions.len(), true)?);

            match parts.next().filter(|uv| !uv.is_empty()) {
                Some(uv) => uvs.push(resolve_index(line, uv, self.uv_table.len(), false)?),
                None => has_uvs = false,
            }
            match parts.next().filter(|normal| !normal.is_empty()) {
                Some(normal) => {
                    normals.push(resolve_index(line, normal, self.normal_table.len(), false)?)
                }
                None => has_normals = false,
            }
        }

        if face.vertices.is_empty() {
            return Err(ParseError::EmptyFace { line });
        }
        face.uvs = has_uvs.then_some(uvs);
        face.normals = has_normals.then_some(normals);
        Ok(face)
    }

    fn build(self, materials: Option<&MaterialTable>) -> MeshWithMaterials {
        let vertex_count = self.positions.len();

        // Texture coordinates are per face corner in the file but per vertex
        // in the output. Faces are applied in file order, so a vertex shared
        // by corners with different coordinates keeps the last one.
        let mut uvs = UNSET_UV.repeat(vertex_count);
        let mut normals = (!self.normal_table.is_empty()).then(|| vec![0.0; vertex_count * 3]);
        for (_, face) in &self.faces {
            if let Some(face_uvs) = &face.uvs {
                for (&vertex, &uv) in face.vertices.iter().zip(face_uvs) {
                    match self.uv_table.get(uv as usize) {
                        Some(&[u, v]) => {
                            let vertex = vertex as usize;
                            uvs[vertex * 2..vertex * 2 + 2].copy_from_slice(&[u, v]);
                        }
                        None => log::debug!("Skipping texture coordinate {uv}, not in table"),
                    }
                }
            }
            if let (Some(face_normals), Some(normals)) = (&face.normals, normals.as_mut()) {
                for (&vertex, &normal) in face.vertices.iter().zip(face_normals) {
                    if let Some(normal) = self.normal_table.get(normal as usize) {
                        let vertex = vertex as usize;
                        normals[vertex * 3..vertex * 3 + 3].copy_from_slice(normal);
                    }
                }
            }
        }

        let mut groups: Vec<MaterialGroup> =
            self.group_names.into_iter().map(MaterialGroup::new).collect();
        for (group, face) in self.faces {
            groups[group].faces.push(face);
        }

        let mut missing_references = Vec::new();
        if let Some(table) = materials {
            for group in &mut groups {
                group.material = table.get(&group.name).cloned();
                if group.material.is_none() && group.name != DEFAULT_GROUP {
                    log::warn!(
                        "Material {:?} not found, its faces use the default material",
                        group.name
                    );
                    missing_references.push(MissingReference {
                        kind: "material",
                        name: group.name.clone(),
                    });
                }
            }
        }

        let mesh = MeshWithMaterials {
            positions: self.positions.into_iter().flatten().collect(),
            uvs,
            normals,
            groups,
            material_library: self.material_library,
            missing_references,
        };
        log::debug!(
            "Parsed model: {} vertices, {} texture coordinates, {} faces in {} groups",
            mesh.vertex_count(),
            self.uv_table.len(),
            mesh.face_count(),
            mesh.groups.len()
        );
        mesh
    }
}

/// Reads up to `N` floats, requiring at least `required`; missing optional
/// components are zero and extra ones are ignored.
fn parse_floats<const N: usize>(
    line: usize,
    directive: &'static str,
    rest: &str,
    required: usize,
) -> Result<[f32; N], ParseError> {
    let mut values = [0.0; N];
    let mut count = 0;
    for (slot, token) in values.iter_mut().zip(rest.split_whitespace()) {
        *slot = token.parse().map_err(|_| ParseError::InvalidNumber {
            line,
            token: token.to_string(),
        })?;
        count += 1;
    }
    if count < required {
        return Err(ParseError::MissingComponent { line, directive });
    }
    Ok(values)
}

/// Converts a 1-based (or negative, relative to the end) index to 0-based.
/// Vertex indices must refer to an already defined vertex; coordinate
/// indices are only checked later, when they are used.
fn resolve_index(
    line: usize,
    token: &str,
    count: usize,
    check_range: bool,
) -> Result<u32, ParseError> {
    let invalid = || ParseError::InvalidIndex {
        line,
        token: token.to_string(),
    };
    let raw: i64 = token.parse().map_err(|_| invalid())?;
    let index = match raw {
        0 => return Err(invalid()),
        raw if raw > 0 => raw - 1,
        raw => count as i64 + raw,
    };
    if index < 0 || (check_range && index as usize >= count) {
        return Err(ParseError::IndexOutOfRange {
            line,
            index: raw.unsigned_abs() as usize,
            count,
        });
    }
    u32::try_from(index).map_err(|_| invalid())
}
