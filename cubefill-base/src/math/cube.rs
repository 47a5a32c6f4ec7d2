use core::fmt;

use crate::math::{GridAab, GridCoordinate, GridPoint};

/// The position of one block: the unit cube whose most negative corner is at `(x, y, z)`.
///
/// Worlds address blocks by [`Cube`], and selections are made of two of them.
/// Keeping cubes apart from [`GridPoint`]s (which are corners, with no extent) is what
/// lets inclusive selections turn into half-open [`GridAab`]s without off-by-one mistakes.
///
/// Any `i32` triple is a valid cube, but a cube with a coordinate of
/// [`GridCoordinate::MAX`] has no representable upper corner, so it cannot be part of
/// any [`GridAab`]; see [`Cube::checked_upper_bounds()`].
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs, clippy::exhaustive_structs)]
pub struct Cube {
    pub x: GridCoordinate,
    pub y: GridCoordinate,
    pub z: GridCoordinate,
}

impl Cube {
    /// The cube at `(0, 0, 0)`, which occupies the space from the origin to `(1, 1, 1)`.
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    #[allow(missing_docs)]
    #[inline]
    pub const fn new(x: GridCoordinate, y: GridCoordinate, z: GridCoordinate) -> Self {
        Self { x, y, z }
    }

    /// The corner of this cube nearest negative infinity on every axis.
    #[inline]
    pub fn lower_bounds(self) -> GridPoint {
        GridPoint::new(self.x, self.y, self.z)
    }

    /// The corner of this cube nearest positive infinity on every axis, if it is
    /// representable.
    #[inline]
    pub fn checked_upper_bounds(self) -> Option<GridPoint> {
        Some(GridPoint::new(
            self.x.checked_add(1)?,
            self.y.checked_add(1)?,
            self.z.checked_add(1)?,
        ))
    }

    /// The box containing only this cube.
    #[inline]
    pub fn checked_grid_aab(self) -> Option<GridAab> {
        GridAab::checked_from_lower_upper(self.lower_bounds(), self.checked_upper_bounds()?).ok()
    }

    /// Splits two cubes into the most negative and most positive corners of the inclusive
    /// box that spans them, taking each axis separately.
    ///
    /// ```
    /// # extern crate cubefill_base as cubefill;
    /// use cubefill::math::Cube;
    ///
    /// assert_eq!(
    ///     Cube::min_max(Cube::new(5, -1, 2), Cube::new(0, 3, 2)),
    ///     (Cube::new(0, -1, 2), Cube::new(5, 3, 2)),
    /// );
    /// ```
    #[inline]
    pub fn min_max(a: Self, b: Self) -> (Self, Self) {
        let lower = Self::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let upper = Self::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
        (lower, upper)
    }
}

impl fmt::Debug for Cube {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Explicit signs keep negative and positive positions equally wide in logs.
        write!(f, "({:+}, {:+}, {:+})", self.x, self.y, self.z)
    }
}

impl From<[GridCoordinate; 3]> for Cube {
    #[inline]
    fn from([x, y, z]: [GridCoordinate; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Cube> for [GridCoordinate; 3] {
    #[inline]
    fn from(cube: Cube) -> Self {
        [cube.x, cube.y, cube.z]
    }
}

impl From<GridPoint> for Cube {
    #[inline]
    fn from(point: GridPoint) -> Self {
        Self::new(point.x, point.y, point.z)
    }
}

impl From<Cube> for GridPoint {
    #[inline]
    fn from(cube: Cube) -> Self {
        cube.lower_bounds()
    }
}
