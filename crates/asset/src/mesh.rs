//! CPU-side mesh representation used by loaders.

use bytemuck::{Pod, Zeroable};
use corelib::{Aabb, Vec3};

/// Vertex with position/normal/colour. Values are in object space.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub colour: [u8; 4],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], colour: [u8; 4]) -> Self {
        Self {
            position,
            normal: [0.0; 3],
            colour,
        }
    }
}

/// Indexed triangle mesh with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Replace every vertex normal with the area-weighted average of the
    /// normals of the triangles that use it. Vertices used by no triangle,
    /// or only by degenerate ones, keep a zero normal.
    pub fn generate_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];
        for [a, b, c] in self.triangles() {
            let (Some(pa), Some(pb), Some(pc)) = (
                self.vertices.get(a as usize),
                self.vertices.get(b as usize),
                self.vertices.get(c as usize),
            ) else {
                continue;
            };
            let pa = Vec3::from_array(pa.position);
            let ab = Vec3::from_array(pb.position) - pa;
            let ac = Vec3::from_array(pc.position) - pa;
            let face = ab.cross(ac);
            for i in [a, b, c] {
                acc[i as usize] += face;
            }
        }
        for (v, n) in self.vertices.iter_mut().zip(acc) {
            v.normal = n.normalize_or_zero().to_array();
        }
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| Vec3::from_array(v.position)))
    }

    /// Vertex buffer as raw bytes, ready for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Mesh plus the data computed once after loading.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticModel {
    pub mesh: MeshData,
    pub bounds: Aabb,
}

impl StaticModel {
    /// Generate normals and bounds for a freshly decoded mesh.
    /// Returns `None` when the mesh has no vertices.
    pub fn from_mesh(mut mesh: MeshData) -> Option<Self> {
        mesh.generate_normals();
        let bounds = mesh.bounds()?;
        Some(Self { mesh, bounds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        let c = [255; 4];
        MeshData::new(
            vec![
                MeshVertex::new([0.0, 0.0, 0.0], c),
                MeshVertex::new([1.0, 0.0, 0.0], c),
                MeshVertex::new([1.0, 1.0, 0.0], c),
                MeshVertex::new([0.0, 1.0, 0.0], c),
            ],
            vec![0, 1, 2, 3, 0, 2],
        )
    }

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
        assert!(!MeshData::default().is_valid());
    }

    #[test]
    fn flat_quad_normals_point_up_z() {
        let mut mesh = quad();
        mesh.generate_normals();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn degenerate_triangle_leaves_zero_normal() {
        let c = [0; 4];
        let mut mesh = MeshData::new(
            vec![MeshVertex::new([1.0, 1.0, 1.0], c); 3],
            vec![0, 1, 2],
        );
        mesh.generate_normals();
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0; 3]));
    }

    #[test]
    fn model_bounds_and_upload_bytes() {
        let model = StaticModel::from_mesh(quad()).expect("non-empty");
        assert_eq!(model.bounds.min, Vec3::ZERO);
        assert_eq!(model.bounds.max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(model.mesh.triangle_count(), 2);
        assert_eq!(
            model.mesh.vertex_bytes().len(),
            4 * std::mem::size_of::<MeshVertex>()
        );
        assert_eq!(model.mesh.index_bytes().len(), 6 * 4);
        assert!(StaticModel::from_mesh(MeshData::default()).is_none());
    }
}
