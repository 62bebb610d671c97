/// Extents below this are treated as a flat or empty box.
const EPSILON: f32 = 0.0001;

/// A simple mesh: flat attribute arrays sharing one vertex index space, and a
/// single triangle-list index buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// XYZ per vertex.
    pub positions: Vec<f32>,
    /// XYZ per vertex, empty if the mesh has no normals.
    pub normals: Vec<f32>,
    /// UV per vertex, empty if the mesh has no texture coordinates.
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_positions(&self.positions)
    }
}

/// Number of triangles a fan over `vertex_count` vertices produces.
pub fn fan_triangle_count(vertex_count: usize) -> usize {
    vertex_count.saturating_sub(2)
}

/// Splits a polygon into triangles that all share its first vertex:
/// (v0, v1, v2), (v0, v2, v3), ... Only correct for convex, planar polygons;
/// anything with fewer than three vertices emits nothing.
pub fn fan_triangulate(polygon: &[u32], out: &mut Vec<u32>) {
    let Some((&pivot, rest)) = polygon.split_first() else {
        return;
    };
    for pair in rest.windows(2) {
        out.extend_from_slice(&[pivot, pair[0], pair[1]]);
    }
}

/// Axis-aligned bounds of a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub const EMPTY: BoundingBox = BoundingBox {
        min: [0.0; 3],
        max: [0.0; 3],
    };

    /// Computes the bounds of a flat XYZ array. An empty array yields
    /// [`BoundingBox::EMPTY`].
    pub fn from_positions(positions: &[f32]) -> BoundingBox {
        let mut points = positions.chunks_exact(3);
        let Some(first) = points.next() else {
            return BoundingBox::EMPTY;
        };
        let mut min = [first[0], first[1], first[2]];
        let mut max = min;
        for point in points {
            for axis in 0..3 {
                min[axis] = min[axis].min(point[axis]);
                max[axis] = max[axis].max(point[axis]);
            }
        }
        BoundingBox { min, max }
    }

    pub fn extents(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    pub fn max_dimension(&self) -> f32 {
        let [w, h, d] = self.extents();
        w.max(h).max(d)
    }

    /// Scale that fits the largest dimension to 1.0.
    pub fn normalization_scale(&self) -> f32 {
        let max_dimension = self.max_dimension();
        if max_dimension > EPSILON {
            1.0 / max_dimension
        } else {
            1.0
        }
    }
}
