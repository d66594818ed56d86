use ordered_float::OrderedFloat;

use crate::{geometry::triangle::closest_point, mesh::Mesh, Pos};

/// Acceleration structure for height queries. By splitting the mesh into
/// segments along the z axis and adding references to all the triangles that
/// overlap each segment, slicing a plane or looking up the surface close to a
/// point only has to look at a fraction of the faces.
pub struct Segments1D {
    start_height: f32,
    segment_height: f32,

    segments: Vec<Vec<usize>>,
    transformed_points: Vec<Pos>,
}

impl Segments1D {
    /// Creates a new Segments structure from a given mesh and segment count.
    pub fn from_mesh(mesh: &Mesh, segment_count: usize) -> Self {
        let segment_count = segment_count.max(1);
        let (min, max) = mesh.bounds();

        // Caching transformed points makes slicing faster.
        let transformed_points = mesh.transformed_vertices();

        let segment_height = ((max.z - min.z) / segment_count as f32).max(f32::EPSILON);
        let mut segments = vec![Vec::new(); segment_count + 1];

        // Adds the index of each face into all of the segments it covers.
        // Faces are pushed in index order so every segment stays sorted.
        for face in 0..mesh.face_count() {
            let (low, high) = triangle_bounds(mesh, &transformed_points, face);
            let first = ((low - min.z) / segment_height).max(0.0) as usize;
            let last = (((high - min.z) / segment_height).max(0.0) as usize).min(segment_count);

            for segment in segments.iter_mut().take(last + 1).skip(first) {
                segment.push(face);
            }
        }

        Self {
            start_height: min.z,
            segment_height,

            segments,
            transformed_points,
        }
    }

    /// Indices of all faces that may span the given height, in ascending
    /// order. Empty outside of the mesh.
    pub fn faces_at(&self, height: f32) -> &[usize] {
        let segment = (height - self.start_height) / self.segment_height;
        if !(0.0..self.segments.len() as f32).contains(&segment) {
            return &[];
        }

        &self.segments[segment as usize]
    }

    /// Transformed mesh vertices, indexed like [`Mesh::vertices`].
    pub fn points(&self) -> &[Pos] {
        &self.transformed_points
    }

    /// Finds the face closest to `point`. The closest face of the segment at
    /// the point's height bounds the search to the segments within that
    /// distance. Points outside of the mesh height check every face.
    pub fn closest_face(&self, mesh: &Mesh, point: &Pos) -> Option<usize> {
        let distance = |face: &usize| {
            let [a, b, c] = mesh.face(*face).map(|v| self.transformed_points[v as usize]);
            OrderedFloat((closest_point(&a, &b, &c, point) - point).norm_squared())
        };

        let Some(guess) = self.faces_at(point.z).iter().copied().min_by_key(distance) else {
            return (0..mesh.face_count()).min_by_key(distance);
        };

        let radius = distance(&guess).0.sqrt();
        let (first, last) = (self.segment(point.z - radius), self.segment(point.z + radius));
        self.segments[first..=last]
            .iter()
            .flatten()
            .copied()
            .min_by_key(distance)
    }

    /// Index of the segment holding `height`, clamped to the mesh.
    fn segment(&self, height: f32) -> usize {
        let segment = ((height - self.start_height) / self.segment_height).max(0.0) as usize;
        segment.min(self.segments.len() - 1)
    }
}

/// Gets the min and max heights of the vertices of a face.
fn triangle_bounds(mesh: &Mesh, points: &[Pos], face: usize) -> (f32, f32) {
    let heights = mesh.face(face).map(|v| points[v as usize].z);
    (
        heights[0].min(heights[1]).min(heights[2]),
        heights[0].max(heights[1]).max(heights[2]),
    )
}
