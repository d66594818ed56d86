use nalgebra::Vector2;
use svg::{
    node::element::{Polyline, Rectangle},
    Document,
};

use crate::print_organization::{PlanarPrintOrganizer, PrintPoint};

const MARGIN: f32 = 5.0;

/// Top view of every layer's print points, laid out as a grid of tiles.
/// Extruding moves are drawn solid, travel and safety moves dashed.
pub struct PreviewFile {
    layers: Vec<Vec<Run>>,
    min: Vector2<f32>,
    size: Vector2<f32>,
}

/// Consecutive print points sharing an extruder state.
struct Run {
    extrudes: bool,
    points: Vec<Vector2<f32>>,
}

impl PreviewFile {
    pub fn new(organizer: &PlanarPrintOrganizer) -> Self {
        let (min, max) = organizer.points().fold(
            (Vector2::repeat(f32::MAX), Vector2::repeat(f32::MIN)),
            |(min, max), point| (min.inf(&point.pt.xy()), max.sup(&point.pt.xy())),
        );
        let (min, max) = if min.x > max.x {
            (Vector2::zeros(), Vector2::zeros())
        } else {
            (min, max)
        };

        Self {
            layers: (organizer.printpoints.iter())
                .map(|layer| runs(&layer.iter().flatten().collect::<Vec<_>>()))
                .collect(),
            min: min - Vector2::repeat(MARGIN),
            size: max - min + Vector2::repeat(2.0 * MARGIN),
        }
    }

    pub fn to_document(&self) -> Document {
        let sides = (self.layers.len() as f32).sqrt().ceil().max(1.0) as usize;
        let (width, height) = (self.size.x, self.size.y);
        let size = (width * sides as f32, height * sides as f32);

        let mut svg = Document::new()
            .set("viewBox", (0, 0, size.0, size.1))
            .set("width", format!("{}mm", size.0))
            .set("height", format!("{}mm", size.1));

        for (idx, layer) in self.layers.iter().enumerate() {
            let (x, y) = (idx % sides, idx / sides);
            let offset = Vector2::new(x as f32 * width, y as f32 * height);

            svg = svg.add(
                Rectangle::new()
                    .set("x", offset.x)
                    .set("y", offset.y)
                    .set("width", width)
                    .set("height", height)
                    .set("fill", "none")
                    .set("stroke", "gray")
                    .set("stroke-width", "0.1"),
            );

            for run in layer.iter() {
                // Flip y so the preview is seen from above.
                let points = (run.points.iter())
                    .map(|p| {
                        let local = p - self.min;
                        (offset.x + local.x, offset.y + height - local.y)
                    })
                    .collect::<Vec<_>>();

                let mut line = Polyline::new()
                    .set("points", points)
                    .set("fill", "none")
                    .set("stroke-width", "0.3");
                line = if run.extrudes {
                    line.set("stroke", "black")
                } else {
                    line.set("stroke", "gray").set("stroke-dasharray", "1 1")
                };
                svg = svg.add(line);
            }
        }

        svg
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// Splits a layer's moves into runs of extruding and non extruding moves.
/// A move extrudes when the point it starts from does.
fn runs(points: &[&PrintPoint]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();

    for pair in points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let extrudes = from.extrudes();

        match runs.last_mut() {
            Some(run) if run.extrudes == extrudes => run.points.push(to.pt.xy()),
            _ => runs.push(Run {
                extrudes,
                points: vec![from.pt.xy(), to.pt.xy()],
            }),
        }
    }

    runs
}
