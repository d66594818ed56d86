use serde::Serialize;

use crate::Pos;

/// One continuous tool move within a layer.
///
/// Closed paths coming out of the slicer repeat their first point at the end,
/// so printing the points in order draws the whole loop. Seam smoothing
/// breaks that on purpose: the path then starts a little after the seam and
/// still ends on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    pub points: Vec<Pos>,
    pub is_closed: bool,
}

/// All paths of one planar cut.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub paths: Vec<Path>,
}

impl Path {
    pub fn new(points: Vec<Pos>, is_closed: bool) -> Self {
        Self { points, is_closed }
    }

    /// True for closed paths whose last point is their first one, the form
    /// the slicer produces.
    pub fn wraps(&self) -> bool {
        self.is_closed && self.points.len() > 1 && self.points.first() == self.points.last()
    }

    /// Makes `index` the new seam of a wrapping path, keeping the point count.
    /// Does nothing for any other path.
    pub fn rotate_seam(&mut self, index: usize) {
        if !self.wraps() {
            return;
        }

        let ring_len = self.points.len() - 1;
        if index == 0 || index >= ring_len {
            return;
        }

        self.points.pop();
        self.points.rotate_left(index);
        self.points.push(self.points[0]);
    }

    pub fn height(&self) -> Option<f32> {
        self.points.first().map(|x| x.z)
    }
}

impl Layer {
    pub fn point_count(&self) -> usize {
        self.paths.iter().map(|x| x.points.len()).sum()
    }

    /// Lowest and highest z of any point in the layer.
    pub fn min_max_z(&self) -> (f32, f32) {
        let points = self.paths.iter().flat_map(|x| x.points.iter());
        points.fold((f32::MAX, f32::MIN), |(min, max), p| {
            (min.min(p.z), max.max(p.z))
        })
    }
}
