use crate::assets::TextureData;
use anyhow::{anyhow, bail, Context, Result};
use glam::{Vec2, Vec3};
use gltf::mesh::Mode;
use std::collections::HashMap;
use std::path::Path;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, uv: Vec2, normal: Vec3) -> Self {
        Self { position: position.to_array(), uv: uv.to_array(), normal: normal.to_array() }
    }
}

/// Which vertex attributes carry meaningful data; the render collaborator uses this to pick a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    Position,
    PositionUv,
    PositionUvNormal,
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub layout: VertexLayout,
    pub bounds: MeshBounds,
}

#[derive(Clone, Debug)]
pub struct MeshBounds {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub radius: f32,
}

impl Mesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>, layout: VertexLayout) -> Self {
        let bounds = MeshBounds::from_vertices(&vertices);
        Self { vertices, indices, layout, bounds }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn triangle() -> Self {
        let positions = [Vec3::new(-0.5, -0.5, 0.0), Vec3::new(0.5, -0.5, 0.0), Vec3::new(0.0, 0.5, 0.0)];
        let vertices = positions.iter().map(|&p| MeshVertex::new(p, Vec2::ZERO, Vec3::Z)).collect();
        Self::new(vertices, vec![0, 1, 2], VertexLayout::Position)
    }

    pub fn textured_triangle() -> Self {
        let corners = [
            (Vec3::new(-0.5, -0.5, 0.0), Vec2::new(0.0, 0.0)),
            (Vec3::new(0.5, -0.5, 0.0), Vec2::new(1.0, 0.0)),
            (Vec3::new(0.0, 0.5, 0.0), Vec2::new(0.5, 1.0)),
        ];
        let vertices = corners.iter().map(|&(p, uv)| MeshVertex::new(p, uv, Vec3::Z)).collect();
        Self::new(vertices, vec![0, 1, 2], VertexLayout::PositionUv)
    }

    pub fn cube(size: f32) -> Self {
        let hs = size * 0.5;
        let positions = [
            Vec3::new(-hs, -hs, -hs),
            Vec3::new(hs, -hs, -hs),
            Vec3::new(hs, hs, -hs),
            Vec3::new(-hs, hs, -hs),
            Vec3::new(-hs, -hs, hs),
            Vec3::new(hs, -hs, hs),
            Vec3::new(hs, hs, hs),
            Vec3::new(-hs, hs, hs),
        ];
        let uv_quad = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        let mut vertices = Vec::with_capacity(24);
        let mut write_face = |corners: [usize; 4], normal: Vec3| {
            for (i, &corner) in corners.iter().enumerate() {
                vertices.push(MeshVertex::new(positions[corner], uv_quad[i], normal));
            }
        };

        write_face([0, 3, 2, 1], Vec3::NEG_Z); // back
        write_face([4, 5, 6, 7], Vec3::Z); // front
        write_face([0, 4, 7, 3], Vec3::NEG_X); // left
        write_face([1, 2, 6, 5], Vec3::X); // right
        write_face([3, 7, 6, 2], Vec3::Y); // top
        write_face([0, 1, 5, 4], Vec3::NEG_Y); // bottom

        let mut indices = Vec::with_capacity(36);
        for face in 0..6 {
            let base = face * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(vertices, indices, VertexLayout::PositionUvNormal)
    }
}

/// Fixed table of shapes a `*[key, name]` block may instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinShape {
    Triangle,
    TexturedTriangle,
    Cube,
}

impl BuiltinShape {
    pub const ALL: [BuiltinShape; 3] = [BuiltinShape::Triangle, BuiltinShape::TexturedTriangle, BuiltinShape::Cube];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "triangle_2D" => Some(Self::Triangle),
            "triangle_2D_Tex" => Some(Self::TexturedTriangle),
            "cube" => Some(Self::Cube),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Triangle => "triangle_2D",
            Self::TexturedTriangle => "triangle_2D_Tex",
            Self::Cube => "cube",
        }
    }

    pub fn build(self) -> Mesh {
        match self {
            Self::Triangle => Mesh::triangle(),
            Self::TexturedTriangle => Mesh::textured_triangle(),
            Self::Cube => Mesh::cube(1.0),
        }
    }
}

/// One sub-mesh of an imported model with its own surface.
#[derive(Clone, Debug)]
pub struct ModelMesh {
    pub mesh: Mesh,
    pub texture: Option<TextureData>,
    pub color: Vec3,
}

#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub meshes: Vec<ModelMesh>,
}

impl ModelData {
    /// Imports every triangle primitive of a glTF document as its own sub-mesh.
    pub fn load_gltf(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let (document, buffers, images) = gltf::import(path_ref)
            .with_context(|| format!("Failed to import glTF from {}", path_ref.display()))?;

        let mut textures: HashMap<usize, TextureData> = HashMap::new();
        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                if primitive.mode() != Mode::Triangles {
                    continue;
                }
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
                let positions: Vec<Vec3> = reader
                    .read_positions()
                    .ok_or_else(|| anyhow!("POSITION attribute missing in {}", path_ref.display()))?
                    .map(Vec3::from_array)
                    .collect();
                if positions.is_empty() {
                    continue;
                }
                let local_indices: Vec<u32> = reader
                    .read_indices()
                    .map(|read| read.into_u32().collect())
                    .unwrap_or_else(|| (0..positions.len() as u32).collect());
                let normals: Vec<Vec3> = match reader.read_normals() {
                    Some(it) => it.map(Vec3::from_array).collect(),
                    None => compute_normals(&positions, &local_indices),
                };
                let tex_coords: Vec<Vec2> = reader
                    .read_tex_coords(0)
                    .map(|coords| coords.into_f32().map(Vec2::from_array).collect())
                    .unwrap_or_default();

                let vertices = positions
                    .iter()
                    .enumerate()
                    .map(|(i, pos)| {
                        let normal = normals.get(i).copied().unwrap_or(Vec3::Y).normalize_or_zero();
                        let uv = tex_coords.get(i).copied().unwrap_or(Vec2::ZERO);
                        MeshVertex::new(*pos, uv, normal)
                    })
                    .collect();

                let pbr = primitive.material().pbr_metallic_roughness();
                let [r, g, b, _] = pbr.base_color_factor();
                let texture = match pbr.base_color_texture() {
                    Some(info) => {
                        let source = info.texture().source().index();
                        if let Some(existing) = textures.get(&source) {
                            Some(existing.clone())
                        } else {
                            let image = images.get(source).ok_or_else(|| {
                                anyhow!("Image index {source} missing in {}", path_ref.display())
                            })?;
                            let texture = TextureData {
                                width: image.width,
                                height: image.height,
                                pixels: convert_image_to_rgba(image)?,
                            };
                            textures.insert(source, texture.clone());
                            Some(texture)
                        }
                    }
                    None => None,
                };

                meshes.push(ModelMesh {
                    mesh: Mesh::new(vertices, local_indices, VertexLayout::PositionUvNormal),
                    texture,
                    color: Vec3::new(r, g, b),
                });
            }
        }

        if meshes.is_empty() {
            bail!("Model {} contains no triangle primitives", path_ref.display());
        }
        Ok(Self { meshes })
    }
}

fn convert_image_to_rgba(image: &gltf::image::Data) -> Result<Vec<u8>> {
    match image.format {
        gltf::image::Format::R8 => {
            let mut out = Vec::with_capacity(image.pixels.len() * 4);
            for &value in &image.pixels {
                out.extend_from_slice(&[value, value, value, 255]);
            }
            Ok(out)
        }
        gltf::image::Format::R8G8 => {
            let mut out = Vec::with_capacity(image.pixels.len() / 2 * 4);
            for chunk in image.pixels.chunks_exact(2) {
                out.extend_from_slice(&[chunk[0], chunk[1], 0, 255]);
            }
            Ok(out)
        }
        gltf::image::Format::R8G8B8 => {
            let mut out = Vec::with_capacity(image.pixels.len() / 3 * 4);
            for chunk in image.pixels.chunks_exact(3) {
                out.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
            }
            Ok(out)
        }
        gltf::image::Format::R8G8B8A8 => Ok(image.pixels.clone()),
        other => bail!("Unsupported image format {:?}", other),
    }
}

fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let normal = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        if normal.length_squared() > 0.0 {
            normals[i0] += normal;
            normals[i1] += normal;
            normals[i2] += normal;
        }
    }
    for normal in &mut normals {
        *normal = if normal.length_squared() > 0.0 { normal.normalize() } else { Vec3::Y };
    }
    normals
}

impl MeshBounds {
    pub fn from_vertices(vertices: &[MeshVertex]) -> Self {
        if vertices.is_empty() {
            return MeshBounds { min: Vec3::ZERO, max: Vec3::ZERO, center: Vec3::ZERO, radius: 0.0 };
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for vertex in vertices {
            let pos = Vec3::from_array(vertex.position);
            min = min.min(pos);
            max = max.max(pos);
        }
        let center = (min + max) * 0.5;
        let radius =
            vertices.iter().map(|v| (Vec3::from_array(v.position) - center).length()).fold(0.0, f32::max);
        MeshBounds { min, max, center, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keys_round_trip() {
        for shape in BuiltinShape::ALL {
            assert_eq!(BuiltinShape::from_key(shape.key()), Some(shape));
        }
        assert_eq!(BuiltinShape::from_key("sphere"), None);
    }

    #[test]
    fn cube_is_unit_sized_and_indexed() {
        let cube = BuiltinShape::Cube.build();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.bounds.min, Vec3::splat(-0.5));
        assert_eq!(cube.bounds.max, Vec3::splat(0.5));
        assert_eq!(cube.vertex_bytes().len(), 24 * std::mem::size_of::<MeshVertex>());
    }

    #[test]
    fn computed_normals_face_out_of_triangle() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = compute_normals(&positions, &[0, 1, 2]);
        for normal in normals {
            assert!((normal - Vec3::Z).length_squared() < 1e-6);
        }
    }
}
