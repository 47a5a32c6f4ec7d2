//! Numeric types for positions and extents on the block grid.

use euclid::{Point3D, Size3D};

use crate::math::Cube;

/// One coordinate of a block position.
pub type GridCoordinate = i32;

/// One dimension of a [`GridSize`]; unsigned so that the widest box still has a size.
pub type GridSizeCoord = u32;

/// A corner point on the block grid. The unit tag is [`Cube`] because a point names the
/// lower corner of the cube at that position.
pub type GridPoint = Point3D<GridCoordinate, Cube>;

/// Extent of a box along each axis, in blocks.
pub type GridSize = Size3D<GridSizeCoord, Cube>;
