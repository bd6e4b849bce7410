//! In-memory mesh model: geometry nodes, face/edge groups and instancing.

use crate::material::Material;
use crate::properties::Properties;
use crate::version::Version;

/// One triangle: three vertex indices plus optional separate normal and UV
/// index triples. Only the vertex indices are persisted; normal/uv triples
/// exist for importers that keep indexed attributes and are expanded by
/// [`MeshNode::flatten_indexed`] before export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Face {
    pub vertex: [u32; 3],
    pub normal: Option<[u32; 3]>,
    pub uv: Option<[u32; 3]>,
}

/// Faces sharing one material batch.
///
/// `batch_id` indexes into the owning mesh's material list; a negative
/// value is a sentinel for batch 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceGroup {
    pub batch_id: i32,
    pub faces: Vec<Face>,
}

/// Edge outline segments sharing one material batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeGroup {
    pub batch_id: i32,
    pub edges: Vec<[u32; 2]>,
}

/// One geometry block: vertex attributes plus grouped faces and edges.
///
/// `normals`, `colors` and `tex_coords` are either empty or the same
/// length as `vertices`. Every index referenced by a face or edge must be
/// `< vertices.len()`; the codec does not re-validate this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshNode {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[u8; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    /// Column-major 4x4 placement matrix.
    pub matrix: Option<[f64; 16]>,
    pub face_groups: Vec<FaceGroup>,
    pub edge_groups: Vec<EdgeGroup>,
    pub properties: Option<Properties>,
}

impl MeshNode {
    /// Axis-aligned bounds as `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    ///
    /// With no vertices the result is the degenerate (MAX, -MAX) box.
    pub fn bounding_box(&self) -> [f64; 6] {
        let mut bounds = [
            f64::MAX,
            f64::MAX,
            f64::MAX,
            -f64::MAX,
            -f64::MAX,
            -f64::MAX,
        ];
        for v in &self.vertices {
            for axis in 0..3 {
                let value = f64::from(v[axis]);
                bounds[axis] = bounds[axis].min(value);
                bounds[axis + 3] = bounds[axis + 3].max(value);
            }
        }
        bounds
    }

    /// Rebuild per-vertex normals from face geometry, area-weighted.
    pub fn recompute_normals(&mut self) {
        let mut normals = vec![[0.0f32; 3]; self.vertices.len()];
        for group in &self.face_groups {
            for face in &group.faces {
                let [a, b, c] = face.vertex;
                let p1 = self.vertices[a as usize];
                let p2 = self.vertices[b as usize];
                let p3 = self.vertices[c as usize];

                let u = [p3[0] - p2[0], p3[1] - p2[1], p3[2] - p2[2]];
                let v = [p1[0] - p2[0], p1[1] - p2[1], p1[2] - p2[2]];
                let cross = [
                    u[1] * v[2] - u[2] * v[1],
                    u[2] * v[0] - u[0] * v[2],
                    u[0] * v[1] - u[1] * v[0],
                ];
                let len = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
                if len == 0.0 {
                    continue;
                }
                let weighted = [cross[0] / len, cross[1] / len, cross[2] / len];
                for &idx in &face.vertex {
                    let n = &mut normals[idx as usize];
                    n[0] += weighted[0];
                    n[1] += weighted[1];
                    n[2] += weighted[2];
                }
            }
        }
        for n in &mut normals {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if len > 0.0 {
                n[0] /= len;
                n[1] /= len;
                n[2] /= len;
            }
        }
        self.normals = normals;
    }

    /// Expand indexed normal/uv triples into flat per-corner attribute
    /// arrays, rewriting face vertex indices to the new layout. Faces
    /// without normal or uv triples fall back to +Z and (0, 0).
    pub fn flatten_indexed(&mut self) {
        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut tex_coords = Vec::new();
        let mut next = 0u32;

        for group in &mut self.face_groups {
            for face in &mut group.faces {
                for corner in 0..3 {
                    match face.normal {
                        Some(n) => normals.push(self.normals[n[corner] as usize]),
                        None => normals.push([0.0, 0.0, 1.0]),
                    }
                    match face.uv {
                        Some(uv) => tex_coords.push(self.tex_coords[uv[corner] as usize]),
                        None => tex_coords.push([0.0, 0.0]),
                    }
                    vertices.push(self.vertices[face.vertex[corner] as usize]);
                }
                face.vertex = [next, next + 1, next + 2];
                face.normal = None;
                face.uv = None;
                next += 3;
            }
        }

        self.vertices = vertices;
        self.normals = normals;
        self.tex_coords = tex_coords;
    }
}

/// Shared geometry/material container, embedded by [`Mesh`] and
/// [`InstanceMesh`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMesh {
    pub materials: Vec<Material>,
    pub nodes: Vec<MeshNode>,
    /// Opaque caller tag; persisted from V4 on.
    pub code: u32,
}

/// One placement template: shared geometry stamped out once per transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceMesh {
    /// Column-major 4x4 matrices, one rendered instance each.
    pub transforms: Vec<[f64; 16]>,
    /// One opaque 64-bit payload per instance.
    pub features: Vec<u64>,
    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    pub bbox: Option<[f64; 6]>,
    pub mesh: BaseMesh,
    /// Nominally one entry per instance; the decoder pads this to
    /// `max(declared, transforms, features)` with `None`.
    pub properties: Vec<Option<Properties>>,
    pub hash: u64,
}

/// Top-level container mapped to one `.mst` stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub base: BaseMesh,
    pub version: Version,
    pub instances: Vec<InstanceMesh>,
    pub properties: Option<Properties>,
}

impl Default for Mesh {
    fn default() -> Self {
        Mesh::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        Mesh {
            base: BaseMesh::default(),
            version: Version::LATEST,
            instances: Vec::new(),
            properties: None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.base.nodes.len()
    }

    pub fn material_count(&self) -> usize {
        self.base.materials.len()
    }

    /// Union of all node bounds; `None` when the mesh has no nodes.
    pub fn bounding_box(&self) -> Option<[f64; 6]> {
        if self.base.nodes.is_empty() {
            return None;
        }
        let mut bounds = [
            f64::MAX,
            f64::MAX,
            f64::MAX,
            -f64::MAX,
            -f64::MAX,
            -f64::MAX,
        ];
        for node in &self.base.nodes {
            let b = node.bounding_box();
            for axis in 0..3 {
                bounds[axis] = bounds[axis].min(b[axis]);
                bounds[axis + 3] = bounds[axis + 3].max(b[axis + 3]);
            }
        }
        Some(bounds)
    }

    /// Encode to `w` at `version`, regardless of `self.version`.
    pub fn encode<W: std::io::Write>(&self, w: W, version: Version) -> crate::Result<()> {
        crate::MstWriter::new(w, version).write_mesh(self)
    }

    /// Decode from `r`; the stream header decides the version.
    pub fn decode<R: std::io::Read>(r: R) -> crate::Result<Mesh> {
        crate::MstReader::new(r).read_mesh()
    }

    /// Read a mesh from an `.mst` file.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Mesh> {
        let file = std::fs::File::open(path)?;
        Mesh::decode(std::io::BufReader::new(file))
    }

    /// Write the mesh at its own version, creating parent directories.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> crate::Result<()> {
        use std::io::Write;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut w = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.encode(&mut w, self.version)?;
        Ok(w.flush()?)
    }
}
