//! Integer grid geometry: cubes, boxes of cubes, and iteration over them.

mod coord;
pub use coord::*;
mod cube;
pub use cube::Cube;
mod grid_aab;
pub use grid_aab::*;
mod grid_iter;
pub use grid_iter::*;

// Volumes and block counts are `usize`, and a 16-bit `usize` could not count even a
// modest fill.
#[cfg(target_pointer_width = "16")]
compile_error!("cubefill does not support platforms with less than 32-bit `usize`");
