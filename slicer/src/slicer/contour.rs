use std::collections::HashMap;

use crate::{
    geometry::{signed_area_xy, Segments1D},
    mesh::Mesh,
    slicer::path::Path,
    Pos,
};

/// A mesh edge, smaller vertex index first. Two faces crossing the plane
/// through the same edge produce the exact same intersection point, which is
/// what joins their segments.
type EdgeKey = (u32, u32);

/// A face crossing the plane, entering and leaving through these edges.
struct Crossing {
    edges: [EdgeKey; 2],
}

/// Intersects the mesh with the horizontal plane at `height` and chains the
/// resulting segments into paths.
pub fn slice_plane(mesh: &Mesh, segments: &Segments1D, height: f32) -> Vec<Path> {
    let points = segments.points();
    let crossings = segments
        .faces_at(height)
        .iter()
        .filter_map(|&face| crossing(mesh.face(face), points, height))
        .collect::<Vec<_>>();

    let mut by_edge = HashMap::<EdgeKey, Vec<usize>>::new();
    for (idx, crossing) in crossings.iter().enumerate() {
        for edge in crossing.edges {
            by_edge.entry(edge).or_default().push(idx);
        }
    }

    let mut used = vec![false; crossings.len()];
    let mut paths = Vec::new();

    // Crossings are in face order, so starting every path at the first unused
    // one keeps the output stable between runs.
    for start in 0..crossings.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let [first, second] = crossings[start].edges;
        let mut edges = vec![first, second];
        walk(&crossings, &by_edge, &mut used, second, &mut edges);

        let is_closed = edges.len() > 3 && edges.last() == Some(&first);
        if !is_closed {
            let mut before = Vec::new();
            walk(&crossings, &by_edge, &mut used, first, &mut before);
            before.reverse();
            before.append(&mut edges);
            edges = before;
        }

        let mut path_points = edges
            .iter()
            .map(|&edge| edge_point(points, edge, height))
            .collect::<Vec<_>>();

        // Vertices lying exactly on the plane show up once per edge using them.
        path_points.dedup();

        if is_closed {
            if path_points.len() < 4 {
                continue;
            }

            if signed_area_xy(&path_points) < 0.0 {
                path_points.reverse();
            }
        } else if path_points.len() < 2 {
            continue;
        }

        paths.push(Path::new(path_points, is_closed));
    }

    paths
}

/// Follows unused crossings from `edge` until the chain ends or closes,
/// pushing every edge it leaves through.
fn walk(
    crossings: &[Crossing],
    by_edge: &HashMap<EdgeKey, Vec<usize>>,
    used: &mut [bool],
    mut edge: EdgeKey,
    out: &mut Vec<EdgeKey>,
) {
    loop {
        let next = by_edge
            .get(&edge)
            .and_then(|faces| faces.iter().copied().find(|&x| !used[x]));
        let Some(next) = next else {
            break;
        };

        used[next] = true;
        let [a, b] = crossings[next].edges;
        edge = if a == edge { b } else { a };
        out.push(edge);
    }
}

/// Finds the two edges of a face that cross the plane. A vertex exactly on
/// the plane counts as below it, so a face either crosses through two edges
/// or not at all.
fn crossing(face: &[u32; 3], points: &[Pos], height: f32) -> Option<Crossing> {
    let above = face.map(|v| points[v as usize].z > height);

    let mut edges = [(0, 0); 2];
    let mut n = 0;
    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        if above[i] ^ above[j] {
            let (a, b) = (face[i], face[j]);
            edges[n] = (a.min(b), a.max(b));
            n += 1;
        }
    }

    (n == 2 && edges[0] != edges[1]).then_some(Crossing { edges })
}

fn edge_point(points: &[Pos], (a, b): EdgeKey, height: f32) -> Pos {
    let (a, b) = (points[a as usize], points[b as usize]);
    let t = (height - a.z) / (b.z - a.z);
    let mut point = a + (b - a) * t;
    point.z = height;
    point
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;

    use super::*;
    use crate::builder::MeshBuilder;

    #[test]
    fn box_gives_one_square() {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::new(-1.0, -2.0, 0.0), Pos::new(1.0, 2.0, 3.0));
        let mesh = builder.build();
        let segments = Segments1D::from_mesh(&mesh, 4);

        let paths = slice_plane(&mesh, &segments, 1.5);
        assert_eq!(paths.len(), 1);

        let path = &paths[0];
        assert!(path.is_closed && path.wraps());
        assert!((signed_area_xy(&path.points) - 8.0).abs() < 1e-4);
        assert!(path.points.iter().all(|p| p.z == 1.5));
    }

    #[test]
    fn two_bodies_two_paths() {
        let mut builder = MeshBuilder::new();
        builder.add_cylinder(Pos::new(-10.0, 0.0, 0.0), 3.0, 5.0, 16);
        builder.add_cylinder(Pos::new(10.0, 0.0, 0.0), 3.0, 5.0, 16);
        let mesh = builder.build();
        let segments = Segments1D::from_mesh(&mesh, 8);

        let paths = slice_plane(&mesh, &segments, 2.0);
        assert_eq!(paths.len(), 2);
        assert!(paths[0].points[0].x < 0.0);
        assert!(paths[1].points[0].x > 0.0);
        assert!(paths.iter().all(|x| x.is_closed));
    }

    #[test]
    fn open_surface_gives_open_path() {
        // A single wall, not closed.
        let mut builder = MeshBuilder::new();
        let a = builder.add_vertex(Pos::new(0.0, 0.0, 0.0));
        let b = builder.add_vertex(Pos::new(4.0, 0.0, 0.0));
        let c = builder.add_vertex(Pos::new(4.0, 0.0, 2.0));
        let d = builder.add_vertex(Pos::new(0.0, 0.0, 2.0));
        builder.add_face([a, b, c]);
        builder.add_face([a, c, d]);
        let mesh = builder.build();
        let segments = Segments1D::from_mesh(&mesh, 2);

        let paths = slice_plane(&mesh, &segments, 1.0);
        assert_eq!(paths.len(), 1);
        assert!(!paths[0].is_closed);
        assert_eq!(paths[0].points.len(), 3);

        let xs = paths[0].points.iter().map(|p| p.x).collect::<Vec<_>>();
        assert!(xs.contains(&0.0) && xs.contains(&4.0));
    }

    #[test]
    fn plane_through_vertices() {
        let square = [
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(0.0, 2.0),
        ];

        let mut builder = MeshBuilder::new();
        builder.add_prism(&square, (0.0, 2.0), 0.0, 1.0);
        let mesh = builder.build();
        let segments = Segments1D::from_mesh(&mesh, 2);

        // Nothing is above the top face.
        assert!(slice_plane(&mesh, &segments, 2.0).is_empty());

        // At the bottom every side edge meets the plane in its lower vertex,
        // which collapses to the outline corners.
        let paths = slice_plane(&mesh, &segments, 0.0);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].points.len(), 5);
        assert!(paths[0].wraps());
    }
}
