//! Clean up passes run on a [`SliceResult`](crate::slicer::SliceResult)
//! before print points are made. None of them add or remove layers or paths.

mod seams_align;
mod seams_smooth;
mod simplify;

pub use seams_align::seams_align;
pub use seams_smooth::seams_smooth;
pub use simplify::{rdp, simplify_paths_rdp};
