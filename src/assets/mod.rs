//! Mesh and material sources: text parsers for `.obj`/`.mtl` and procedural
//! generators. Nothing here touches the GPU.

pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod sphere;

pub use mesh::{BoundingBox, MeshData};
pub use mtl::{Material, MaterialTable};
pub use obj::{MaterialGroup, MeshWithMaterials};
pub use sphere::{generate_sphere, generate_sphere_preset, SphereDetail};
