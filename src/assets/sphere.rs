//! UV spheres generated from latitude/longitude bands.

use std::f32::consts::PI;

use crate::assets::mesh::MeshData;
use crate::error::InvalidArgument;

/// Tessellation presets, from cheapest to smoothest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SphereDetail {
    Low,
    Medium,
    Optimized,
    High,
    Ultra,
}

impl SphereDetail {
    /// `(latitudes, longitudes)` for this preset.
    pub const fn bands(self) -> (usize, usize) {
        match self {
            SphereDetail::Low => (8, 16),
            SphereDetail::Medium => (16, 32),
            SphereDetail::Optimized => (12, 24),
            SphereDetail::High => (32, 64),
            SphereDetail::Ultra => (64, 128),
        }
    }
}

pub fn generate_sphere_preset(radius: f32, detail: SphereDetail) -> Result<MeshData, InvalidArgument> {
    let (latitudes, longitudes) = detail.bands();
    generate_sphere(radius, latitudes, longitudes)
}

/// Generates a sphere centered on the origin with `y` as the polar axis.
///
/// The first and last vertex of every ring coincide, so the texture seam gets
/// its own column of vertices with `u = 0` and `u = 1`. The output only
/// depends on the arguments.
pub fn generate_sphere(
    radius: f32,
    latitudes: usize,
    longitudes: usize,
) -> Result<MeshData, InvalidArgument> {
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(InvalidArgument {
            name: "radius",
            value: radius.to_string(),
            requirement: "a finite number greater than 0",
        });
    }
    if latitudes < 2 {
        return Err(InvalidArgument {
            name: "latitudes",
            value: latitudes.to_string(),
            requirement: "at least 2",
        });
    }
    if longitudes < 3 {
        return Err(InvalidArgument {
            name: "longitudes",
            value: longitudes.to_string(),
            requirement: "at least 3",
        });
    }
    let stride = longitudes + 1;
    let vertex_count = (latitudes + 1)
        .checked_mul(stride)
        .filter(|&count| u32::try_from(count).is_ok())
        .ok_or_else(|| InvalidArgument {
            name: "latitudes * longitudes",
            value: format!("{latitudes} * {longitudes}"),
            requirement: "small enough for 32-bit indices",
        })?;

    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut normals = Vec::with_capacity(vertex_count * 3);
    let mut uvs = Vec::with_capacity(vertex_count * 2);
    for lat in 0..=latitudes {
        let v = lat as f32 / latitudes as f32;
        let (sin_theta, cos_theta) = (v * PI).sin_cos();
        for lon in 0..=longitudes {
            let u = lon as f32 / longitudes as f32;
            let (sin_phi, cos_phi) = (u * 2.0 * PI).sin_cos();
            let normal = [cos_phi * sin_theta, cos_theta, sin_phi * sin_theta];
            positions.extend(normal.map(|n| n * radius));
            normals.extend(normal);
            uvs.extend([u, v]);
        }
    }

    let mut indices = Vec::with_capacity(latitudes * longitudes * 6);
    for lat in 0..latitudes {
        for lon in 0..longitudes {
            let first = (lat * stride + lon) as u32;
            let second = first + stride as u32;
            indices.extend([first, second, first + 1, second, second + 1, first + 1]);
        }
    }

    log::debug!(
        "Generated sphere r={radius} {latitudes}x{longitudes}: {} vertices, {} triangles",
        vertex_count,
        indices.len() / 3
    );
    Ok(MeshData {
        positions,
        normals,
        uvs,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_the_band_layout() -> Result<(), InvalidArgument> {
        for (latitudes, longitudes) in [(2, 3), (5, 7), (16, 32)] {
            let mesh = generate_sphere(1.5, latitudes, longitudes)?;
            assert_eq!(mesh.vertex_count(), (latitudes + 1) * (longitudes + 1));
            assert_eq!(mesh.index_count(), latitudes * longitudes * 6);
            assert_eq!(mesh.normals.len(), mesh.positions.len());
            assert_eq!(mesh.uvs.len(), mesh.vertex_count() * 2);
            let max_index = *mesh.indices.iter().max().unwrap() as usize;
            assert!(max_index < mesh.vertex_count());
        }
        Ok(())
    }

    #[test]
    fn normals_are_unit_and_uvs_in_range() -> Result<(), InvalidArgument> {
        let mesh = generate_sphere(3.0, 9, 13)?;
        for (normal, position) in mesh.normals.chunks(3).zip(mesh.positions.chunks(3)) {
            let length = normal.iter().map(|n| n * n).sum::<f32>().sqrt();
            assert!((length - 1.0).abs() < 1e-5);
            for axis in 0..3 {
                assert!((position[axis] - normal[axis] * 3.0).abs() < 1e-5);
            }
        }
        assert!(mesh.uvs.iter().all(|&c| (0.0..=1.0).contains(&c)));
        Ok(())
    }

    #[test]
    fn poles_lie_on_the_y_axis() -> Result<(), InvalidArgument> {
        let mesh = generate_sphere(2.0, 4, 6)?;
        assert_eq!(&mesh.positions[..3], &[0.0, 2.0, 0.0]);
        let south = &mesh.positions[mesh.positions.len() - 3..];
        assert!((south[1] + 2.0).abs() < 1e-5);
        assert_eq!(&mesh.uvs[..2], &[0.0, 0.0]);
        assert_eq!(&mesh.uvs[mesh.uvs.len() - 2..], &[1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn first_quad_winding() -> Result<(), InvalidArgument> {
        let mesh = generate_sphere(1.0, 2, 3)?;
        assert_eq!(&mesh.indices[..6], &[0, 4, 1, 4, 5, 1]);
        Ok(())
    }

    #[test]
    fn output_is_deterministic() -> Result<(), InvalidArgument> {
        assert_eq!(
            generate_sphere_preset(0.5, SphereDetail::Optimized)?,
            generate_sphere(0.5, 12, 24)?
        );
        Ok(())
    }

    #[test]
    fn rejects_degenerate_arguments() {
        assert_eq!(generate_sphere(0.0, 8, 8).unwrap_err().name, "radius");
        assert_eq!(generate_sphere(-1.0, 8, 8).unwrap_err().name, "radius");
        assert_eq!(generate_sphere(f32::NAN, 8, 8).unwrap_err().name, "radius");
        assert_eq!(generate_sphere(1.0, 1, 8).unwrap_err().name, "latitudes");
        assert_eq!(generate_sphere(1.0, 8, 2).unwrap_err().name, "longitudes");
    }
}
