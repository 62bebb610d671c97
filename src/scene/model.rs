use glam::{Mat4, Quat, Vec3};

use crate::assets::obj::{self, GroupRange, MeshWithMaterials};
use crate::assets::MaterialTable;
use crate::camera::CameraController;
use crate::error::RendererError;
use crate::renderer::gpu::{Gpu, GpuMesh, Program, Texture, Uniform, VertexStreams};
use crate::renderer::textures::TextureLibrary;
use crate::scene::{
    set_matrices, FrameContext, RenderObject, Transform, LIT_FRAGMENT_SHADER, LIT_VERTEX_SHADER,
};

pub const STATION_OBJ: &str = include_str!("../../assets/models/station.obj");
pub const STATION_MTL: &str = include_str!("../../assets/models/station.mtl");

/// Draw state of one material group.
#[derive(Debug, Clone, PartialEq)]
struct GroupDraw {
    range: GroupRange,
    color: [f32; 4],
    texture: Option<Texture>,
}

/// A parsed model drawn one material group at a time, scaled to unit size
/// and slowly spinning around Y.
pub struct Model {
    placement: Transform,
    /// Moves the model's bounding box center to the origin and its largest
    /// dimension to 1.
    normalization: Mat4,
    spin_speed: f32,
    spin_degrees: f32,
    groups: Vec<GroupDraw>,
    emissive: f32,
    resources: Option<(Program, GpuMesh)>,
}

impl Model {
    /// Parses `.obj` and `.mtl` text and uploads the result.
    pub fn from_sources(
        gpu: &mut dyn Gpu,
        textures: &mut dyn TextureLibrary,
        obj_text: &str,
        mtl_text: &str,
        placement: Transform,
        spin_speed: f32,
    ) -> Result<Model, RendererError> {
        let materials = MaterialTable::parse_str(mtl_text);
        let mesh = obj::parse_str(obj_text, Some(&materials))?;
        Model::new(gpu, textures, &mesh, placement, spin_speed)
    }

    pub fn new(
        gpu: &mut dyn Gpu,
        textures: &mut dyn TextureLibrary,
        mesh: &MeshWithMaterials,
        placement: Transform,
        spin_speed: f32,
    ) -> Result<Model, RendererError> {
        let program = gpu.create_program(LIT_VERTEX_SHADER, LIT_FRAGMENT_SHADER)?;
        let (indices, ranges) = mesh.build_index_buffer();
        let gpu_mesh = gpu.upload_mesh(
            VertexStreams {
                positions: &mesh.positions,
                normals: mesh.normals.as_deref(),
                uvs: Some(&mesh.uvs),
            },
            &indices,
        );

        let groups = mesh
            .groups
            .iter()
            .zip(ranges)
            .map(|(group, range)| {
                let material = group.material_or_default();
                let [r, g, b] = material.diffuse;
                let texture = material
                    .diffuse_texture
                    .as_deref()
                    .and_then(|name| textures.texture(gpu, name));
                GroupDraw {
                    range,
                    color: [r, g, b, material.alpha],
                    texture,
                }
            })
            .collect();

        let bounds = mesh.bounding_box();
        let scale = bounds.normalization_scale();
        let normalization = Mat4::from_scale(Vec3::splat(scale))
            * Mat4::from_translation(-Vec3::from(bounds.center()));

        Ok(Model {
            placement,
            normalization,
            spin_speed,
            spin_degrees: 0.0,
            groups,
            // Without normals there is nothing to light.
            emissive: if mesh.normals.is_some() { 0.0 } else { 1.0 },
            resources: Some((program, gpu_mesh)),
        })
    }

    pub fn model_matrix(&self) -> Mat4 {
        let transform = Transform {
            rotation: self.placement.rotation * Quat::from_rotation_y(self.spin_degrees.to_radians()),
            ..self.placement
        };
        transform.matrix() * self.normalization
    }
}

impl RenderObject for Model {
    fn update(&mut self, dt: f32, _camera: &dyn CameraController) {
        self.spin_degrees = (self.spin_degrees + dt * self.spin_speed) % 360.0;
    }

    fn draw(&self, gpu: &mut dyn Gpu, frame: &FrameContext) {
        let Some((program, mesh)) = &self.resources else {
            return;
        };
        gpu.use_program(*program);
        set_matrices(gpu, *program, self.model_matrix(), frame);
        gpu.set_uniform(*program, "u_emissive", Uniform::Float(self.emissive));
        gpu.set_uniform(*program, "u_texture", Uniform::Int(0));
        for group in &self.groups {
            gpu.set_uniform(*program, "u_color", Uniform::Vec4(group.color));
            gpu.set_uniform(
                *program,
                "u_use_texture",
                Uniform::Int(group.texture.is_some() as i32),
            );
            gpu.bind_texture(0, group.texture);
            gpu.draw_elements(mesh, group.range.first_index, group.range.index_count);
        }
    }

    fn release(&mut self, gpu: &mut dyn Gpu) {
        if let Some((program, mesh)) = self.resources.take() {
            gpu.delete_mesh(&mesh);
            gpu.delete_program(program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::renderer::recording::{Call, RecordingGpu};
    use crate::scene::tests::{frame, NoTextures};

    #[test]
    fn embedded_station_parses_cleanly() -> Result<(), ParseError> {
        let materials = MaterialTable::parse_str(STATION_MTL);
        assert!(materials.diagnostics().is_empty());
        let mesh = obj::parse_str(STATION_OBJ, Some(&materials))?;

        assert_eq!(mesh.material_library.as_deref(), Some("station.mtl"));
        assert!(mesh.missing_references.is_empty());
        let names: Vec<&str> = mesh.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["hull", "panel", "beacon"]);
        assert_eq!(mesh.triangle_count(), 12 + 4 + 4);
        assert!((mesh.group("beacon").unwrap().material.as_ref().unwrap().alpha - 0.9).abs() < 1e-6);
        assert_eq!(mesh.bounding_box().max_dimension(), 4.0);
        Ok(())
    }

    #[test]
    fn draws_each_group_with_its_material() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let mut textures = NoTextures::default();
        let model = Model::from_sources(
            &mut gpu,
            &mut textures,
            STATION_OBJ,
            STATION_MTL,
            Transform::default(),
            0.0,
        )?;
        assert_eq!(textures.lookups, vec!["textures/solar_panel.png".to_string()]);

        gpu.take_calls();
        model.draw(&mut gpu, &frame());
        let draws: Vec<(usize, usize)> = gpu
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::DrawElements {
                    first_index,
                    index_count,
                    ..
                } => Some((*first_index, *index_count)),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![(0, 36), (36, 12), (48, 12)]);

        let (program, _) = model.resources.as_ref().unwrap();
        assert!(gpu.calls.contains(&Call::SetUniform(
            *program,
            "u_color".to_string(),
            Uniform::Vec4([0.12, 0.2, 0.55, 1.0])
        )));
        Ok(())
    }

    #[test]
    fn missing_material_falls_back_to_default() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let mut textures = NoTextures::default();
        let model = Model::from_sources(
            &mut gpu,
            &mut textures,
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl ghost\nf 1 2 3\n",
            "",
            Transform::default(),
            0.0,
        )?;
        assert_eq!(model.groups[0].color, [0.8, 0.8, 0.8, 1.0]);
        assert_eq!(model.emissive, 1.0);
        Ok(())
    }

    #[test]
    fn normalizes_to_unit_size_around_the_center() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let model = Model::from_sources(
            &mut gpu,
            &mut NoTextures::default(),
            "v 2 2 2\nv 6 2 2\nv 2 4 2\nf 1 2 3\n",
            "",
            Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            0.0,
        )?;
        let matrix = model.model_matrix();
        let far_corner = matrix.transform_point3(Vec3::new(6.0, 2.0, 2.0));
        assert!((far_corner - Vec3::new(0.5, 0.75, 0.0)).length() < 1e-5);
        Ok(())
    }

    #[test]
    fn geometry_errors_reach_the_caller() {
        let mut gpu = RecordingGpu::new();
        let result = Model::from_sources(
            &mut gpu,
            &mut NoTextures::default(),
            "v 0 zero 0\n",
            "",
            Transform::default(),
            0.0,
        );
        assert!(matches!(
            result,
            Err(RendererError::Parse(ParseError::InvalidNumber { line: 1, .. }))
        ));
        assert_eq!(gpu.live_count(), 0);
    }
}
