use std::{
    collections::HashMap,
    io::{BufRead, Seek},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use nalgebra::Matrix4;
use obj::raw::object::Polygon;
use serde::Serialize;

use crate::Pos;

/// A mesh made of vertices and triangular faces. It can be scaled, translated,
/// and rotated without touching the shared vertex data.
#[derive(Debug, Clone)]
pub struct Mesh {
    inner: Arc<MeshInner>,

    transformation_matrix: Matrix4<f32>,

    position: Pos,
    scale: Pos,
    rotation: Pos,
}

#[derive(Debug)]
struct MeshInner {
    vertices: Box<[Pos]>,
    faces: Box<[[u32; 3]]>,
}

/// Vertices and faces of a mesh with its transformation applied, as written
/// to the slicer output.
#[derive(Debug, Serialize)]
pub struct MeshData {
    pub vertices: Vec<Pos>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Creates a new mesh from the given vertices and faces with an identity
    /// transformation.
    pub fn new(vertices: Vec<Pos>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            inner: Arc::new(MeshInner {
                vertices: vertices.into_boxed_slice(),
                faces: faces.into_boxed_slice(),
            }),
            ..Default::default()
        }
    }

    /// Untransformed vertex positions.
    pub fn vertices(&self) -> &[Pos] {
        self.inner.vertices.as_ref()
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        self.inner.faces.as_ref()
    }

    pub fn face(&self, index: usize) -> &[u32; 3] {
        &self.faces()[index]
    }

    /// The three transformed corners of a face.
    pub fn face_verts(&self, index: usize) -> [Pos; 3] {
        let vertices = self.vertices();
        self.face(index)
            .map(|vertex| self.transform(&vertices[vertex as usize]))
    }

    /// Unit normal of a face in world space, following the right hand rule
    /// on its vertex order. Degenerate faces give a zero vector.
    pub fn normal(&self, index: usize) -> Pos {
        let [v0, v1, v2] = self.face_verts(index);
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Pos::zeros)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().len()
    }

    pub fn face_count(&self) -> usize {
        self.faces().len()
    }

    /// Every vertex with the transformation applied.
    pub fn transformed_vertices(&self) -> Vec<Pos> {
        self.vertices().iter().map(|v| self.transform(v)).collect()
    }

    /// A mesh is considered closed when every edge is shared by exactly two
    /// faces.
    pub fn is_manifold(&self) -> bool {
        let mut edges = HashMap::<_, u8>::new();

        for [a, b, c] in self.faces() {
            for (a, b) in [(a, b), (b, c), (c, a)] {
                let count = edges.entry((a.min(b), a.max(b))).or_default();
                *count = count.saturating_add(1);
            }
        }

        edges.values().all(|&count| count == 2)
    }

    /// Updates the internal transformation matrix, called by all the setters.
    fn update_transformation_matrix(&mut self) {
        let scale = Matrix4::new_nonuniform_scaling(&self.scale);
        let rotation =
            Matrix4::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z);
        let translation = Matrix4::new_translation(&self.position);

        self.transformation_matrix = translation * scale * rotation;
    }

    /// Transforms a point according to the models translation, scale, and rotation.
    pub fn transform(&self, pos: &Pos) -> Pos {
        (self.transformation_matrix * pos.push(1.0)).xyz()
    }

    /// Get the minimum and maximum of each component of every transformed
    /// vertex. These points define the bounding box of the model.
    pub fn bounds(&self) -> (Pos, Pos) {
        self.vertices().iter().map(|v| self.transform(v)).fold(
            (Pos::repeat(f32::MAX), Pos::repeat(f32::MIN)),
            |(min, max), v| (min.inf(&v), max.sup(&v)),
        )
    }

    pub fn to_data(&self) -> MeshData {
        MeshData {
            vertices: self.transformed_vertices(),
            faces: self.faces().to_vec(),
        }
    }
}

impl Mesh {
    pub fn transformation_matrix(&self) -> &Matrix4<f32> {
        &self.transformation_matrix
    }

    pub fn set_position(&mut self, pos: Pos) {
        self.position = pos;
        self.update_transformation_matrix();
    }

    pub fn position(&self) -> Pos {
        self.position
    }

    pub fn set_scale(&mut self, scale: Pos) {
        self.scale = scale;
        self.update_transformation_matrix();
    }

    pub fn scale(&self) -> Pos {
        self.scale
    }

    /// Changes the rotation of the model, as [Euler
    /// angles](https://en.wikipedia.org/wiki/Euler_angles) in radians.
    pub fn set_rotation(&mut self, rotation: Pos) {
        self.rotation = rotation;
        self.update_transformation_matrix();
    }

    pub fn rotation(&self) -> Pos {
        self.rotation
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            inner: Arc::new(MeshInner {
                vertices: Box::new([]),
                faces: Box::new([]),
            }),

            transformation_matrix: Matrix4::identity(),

            position: Pos::repeat(0.0),
            scale: Pos::repeat(1.0),
            rotation: Pos::repeat(0.0),
        }
    }
}

/// Loads a mesh from a reader. Supported formats are `stl` (ascii and
/// binary) and `obj`, polygons with more than three corners are split into
/// triangle fans.
pub fn load_mesh<T: BufRead + Seek>(mut reader: T, format: &str) -> Result<Mesh> {
    let (vertices, faces) = match format.to_ascii_lowercase().as_str() {
        "stl" => {
            let stl = stl_io::read_stl(&mut reader).context("Failed to parse stl")?;
            let vertices = (stl.vertices.iter())
                .map(|v| Pos::new(v[0], v[1], v[2]))
                .collect::<Vec<_>>();
            let faces = (stl.faces.iter())
                .map(|f| f.vertices.map(|v| v as u32))
                .collect::<Vec<_>>();
            (vertices, faces)
        }
        "obj" => {
            let obj = obj::raw::parse_obj(reader).context("Failed to parse obj")?;
            let vertices = (obj.positions.iter())
                .map(|&(x, y, z, _)| Pos::new(x, y, z))
                .collect::<Vec<_>>();

            let mut faces = Vec::with_capacity(obj.polygons.len());
            for polygon in obj.polygons.iter() {
                let corners = match polygon {
                    Polygon::P(corners) => corners.clone(),
                    Polygon::PT(corners) | Polygon::PN(corners) => {
                        corners.iter().map(|x| x.0).collect()
                    }
                    Polygon::PTN(corners) => corners.iter().map(|x| x.0).collect(),
                };

                for i in 1..corners.len().saturating_sub(1) {
                    faces.push([corners[0], corners[i], corners[i + 1]].map(|x| x as u32));
                }
            }
            (vertices, faces)
        }
        other => bail!("Unsupported mesh format `{other}`"),
    };

    if faces.is_empty() {
        bail!("Mesh has no faces");
    }

    let vertex_count = vertices.len() as u32;
    if let Some(face) = faces.iter().find(|f| f.iter().any(|&v| v >= vertex_count)) {
        bail!("Face {face:?} references a vertex that does not exist");
    }

    Ok(Mesh::new(vertices, faces))
}

/// Translates the mesh so the center of the bottom face of its bounding box
/// lands on `target`.
pub fn move_mesh_to_point(mesh: &mut Mesh, target: Pos) {
    let (min, max) = mesh.bounds();
    let base = Pos::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0, min.z);
    mesh.set_position(mesh.position() + target - base);
}

#[cfg(test)]
mod tests {
    use std::{f32::consts::FRAC_PI_2, io::Cursor};

    use super::*;
    use crate::builder::MeshBuilder;

    const QUAD_OBJ: &str = "\
# two faces sharing an edge
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
vt 0 0
f 1 2 3 4
f 1/1 2/1 5/1
";

    #[test]
    fn load_obj_triangulates_polygons() {
        let mesh = load_mesh(Cursor::new(QUAD_OBJ), "OBJ").unwrap();
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.faces(), &[[0, 1, 2], [0, 2, 3], [0, 1, 4]]);
        assert!(!mesh.is_manifold());
    }

    #[test]
    fn load_binary_stl() {
        let tetrahedron = [
            [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        ]
        .map(|[a, b, c]| stl_io::Triangle {
            normal: stl_io::Normal::new([0.0, 0.0, 0.0]),
            vertices: [a, b, c].map(stl_io::Vertex::new),
        });

        let mut buffer = Cursor::new(Vec::new());
        stl_io::write_stl(&mut buffer, tetrahedron.iter()).unwrap();
        buffer.set_position(0);

        let mesh = load_mesh(buffer, "stl").unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.is_manifold());
    }

    #[test]
    fn unsupported_format() {
        let err = load_mesh(Cursor::new(QUAD_OBJ), "ply").unwrap_err();
        assert!(err.to_string().contains("ply"));
    }

    #[test]
    fn obj_without_faces() {
        assert!(load_mesh(Cursor::new("v 0 0 0\nv 1 0 0\n"), "obj").is_err());
    }

    #[test]
    fn move_to_origin_uses_bottom_center() {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::new(10.0, -4.0, 3.0), Pos::new(14.0, 2.0, 9.0));
        let mut mesh = builder.build();
        assert!(mesh.is_manifold());

        move_mesh_to_point(&mut mesh, Pos::zeros());
        let (min, max) = mesh.bounds();
        assert_eq!(min, Pos::new(-2.0, -3.0, 0.0));
        assert_eq!(max, Pos::new(2.0, 3.0, 6.0));

        move_mesh_to_point(&mut mesh, Pos::new(1.0, 1.0, 1.0));
        assert_eq!(mesh.bounds().0, Pos::new(-1.0, -2.0, 1.0));
    }

    #[test]
    fn normals_point_outwards() {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::zeros(), Pos::repeat(1.0));
        let mesh = builder.build();

        let (min, max) = mesh.bounds();
        let center = (min + max) / 2.0;
        for face in 0..mesh.face_count() {
            let [v0, v1, v2] = mesh.face_verts(face);
            let centroid = (v0 + v1 + v2) / 3.0;
            assert!(mesh.normal(face).dot(&(centroid - center)) > 0.0);
        }
    }

    #[test]
    fn rotation_is_roll_pitch_yaw() {
        let mut mesh = Mesh::new(vec![Pos::x(), Pos::y(), Pos::z()], vec![[0, 1, 2]]);

        mesh.set_rotation(Pos::new(FRAC_PI_2, 0.0, 0.0));
        assert!((mesh.transform(&Pos::y()) - Pos::z()).norm() < 1e-5);

        mesh.set_rotation(Pos::new(0.0, FRAC_PI_2, 0.0));
        assert!((mesh.transform(&Pos::z()) - Pos::x()).norm() < 1e-5);

        mesh.set_rotation(Pos::new(0.0, 0.0, FRAC_PI_2));
        assert!((mesh.transform(&Pos::x()) - Pos::y()).norm() < 1e-5);
    }
}
