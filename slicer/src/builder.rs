use std::f32::consts::TAU;

use nalgebra::Vector2;

use crate::{mesh::Mesh, Pos};

/// Builds closed meshes out of simple solids. Mostly useful for tests and
/// benchmarks where loading a model from disk is not wanted.
#[derive(Default)]
pub struct MeshBuilder {
    vertices: Vec<Pos>,
    faces: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, vertex: Pos) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    pub fn add_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
    }

    pub fn build(self) -> Mesh {
        Mesh::new(self.vertices, self.faces)
    }
}

impl MeshBuilder {
    /// Extrudes a star shaped outline (counter-clockwise, seen from above)
    /// from `bottom` to `top`. The `twist` (radians) rotates the top outline
    /// around the outline's centroid and `taper` scales it, which makes for
    /// slices that differ from layer to layer.
    pub fn add_prism(
        &mut self,
        outline: &[Vector2<f32>],
        (bottom, top): (f32, f32),
        twist: f32,
        taper: f32,
    ) {
        if outline.len() < 3 {
            return;
        }

        let centroid = outline.iter().sum::<Vector2<f32>>() / outline.len() as f32;
        let (sin, cos) = twist.sin_cos();
        let top_outline = outline.iter().map(|point| {
            let offset = (point - centroid) * taper;
            let rotated = Vector2::new(
                offset.x * cos - offset.y * sin,
                offset.x * sin + offset.y * cos,
            );
            centroid + rotated
        });

        let bottom_ring = (outline.iter())
            .map(|point| self.add_vertex(point.push(bottom)))
            .collect::<Vec<_>>();
        let top_ring = top_outline
            .map(|point| self.add_vertex(point.push(top)))
            .collect::<Vec<_>>();
        let bottom_center = self.add_vertex(centroid.push(bottom));
        let top_center = self.add_vertex(centroid.push(top));

        let n = outline.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let (b0, b1, t0, t1) = (bottom_ring[i], bottom_ring[j], top_ring[i], top_ring[j]);

            self.add_face([b0, b1, t1]);
            self.add_face([b0, t1, t0]);
            self.add_face([top_center, t0, t1]);
            self.add_face([bottom_center, b1, b0]);
        }
    }

    /// Axis aligned box between the two corners.
    pub fn add_box(&mut self, min: Pos, max: Pos) {
        let outline = [
            Vector2::new(min.x, min.y),
            Vector2::new(max.x, min.y),
            Vector2::new(max.x, max.y),
            Vector2::new(min.x, max.y),
        ];
        self.add_prism(&outline, (min.z, max.z), 0.0, 1.0);
    }

    /// Vertical cylinder standing on `base`, approximated with `segments`
    /// sides.
    pub fn add_cylinder(&mut self, base: Pos, radius: f32, height: f32, segments: u32) {
        let outline = (0..segments)
            .map(|i| {
                let angle = TAU * i as f32 / segments as f32;
                base.xy() + Vector2::new(angle.cos(), angle.sin()) * radius
            })
            .collect::<Vec<_>>();
        self.add_prism(&outline, (base.z, base.z + height), 0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prisms_are_closed() {
        let mut builder = MeshBuilder::new();
        builder.add_cylinder(Pos::zeros(), 5.0, 20.0, 24);
        let mesh = builder.build();

        assert!(mesh.is_manifold());
        assert_eq!(mesh.vertex_count(), 24 * 2 + 2);
        assert_eq!(mesh.face_count(), 24 * 4);
    }

    #[test]
    fn twisted_prism_bounds() {
        let square = [
            Vector2::new(-1.0, -1.0),
            Vector2::new(1.0, -1.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(-1.0, 1.0),
        ];

        let mut builder = MeshBuilder::new();
        builder.add_prism(&square, (2.0, 7.0), TAU / 8.0, 0.5);
        let mesh = builder.build();

        let (min, max) = mesh.bounds();
        assert_eq!((min.z, max.z), (2.0, 7.0));
        assert_eq!((min.x, max.x), (-1.0, 1.0));
        assert!(mesh.is_manifold());
    }
}
