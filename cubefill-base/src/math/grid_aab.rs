//! Half-open boxes of cubes ([`GridAab`]).

use core::fmt;

use euclid::size3;

use crate::math::{Cube, GridIter, GridPoint, GridSize, GridSizeCoord};

/// A box of cubes, aligned to the grid, with inclusive lower and exclusive upper bounds.
///
/// Every [`GridAab`] can be counted: construction rejects boxes whose volume would not
/// fit in a [`usize`]. A box may be flat (zero size on some axis) and hence empty;
/// flat boxes at different positions or orientations are still distinct values.
///
/// Selections made by players name two *inclusive* corners instead;
/// [`GridAab::from_inclusive_corners()`] converts those.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct GridAab {
    lower: GridPoint,
    /// Never less than `lower` on any axis.
    upper: GridPoint,
}

impl GridAab {
    /// Constructs the box from `lower` (inclusive) to `upper` (exclusive).
    ///
    /// Fails if `upper` is below `lower` on any axis, or if the box is too big to count.
    #[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
    pub fn checked_from_lower_upper(
        lower: impl Into<GridPoint>,
        upper: impl Into<GridPoint>,
    ) -> Result<Self, GridOverflowError> {
        let lower = lower.into();
        let upper = upper.into();
        if lower.x > upper.x || lower.y > upper.y || lower.z > upper.z {
            return Err(GridOverflowError(OverflowKind::Inverted {
                lower: lower.into(),
                upper: upper.into(),
            }));
        }
        let aab = GridAab { lower, upper };
        match aab.volume() {
            Some(_) => Ok(aab),
            None => Err(GridOverflowError(OverflowKind::Uncountable { size: aab.size() })),
        }
    }

    /// Panicking version of [`GridAab::checked_from_lower_upper()`], for constants and tests.
    #[track_caller]
    #[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
    pub fn from_lower_upper(lower: impl Into<GridPoint>, upper: impl Into<GridPoint>) -> Self {
        match Self::checked_from_lower_upper(lower, upper) {
            Ok(aab) => aab,
            Err(e) => panic!("GridAab::from_lower_upper: {e}"),
        }
    }

    /// Constructs the box whose lower corner is `lower` and which extends `size` cubes
    /// along each axis. Panics if the upper corner would be out of range.
    ///
    /// ```
    /// # extern crate cubefill_base as cubefill;
    /// use cubefill::math::GridAab;
    ///
    /// let slab = GridAab::from_lower_size([-10, 3, 7], [100, 1, 300]);
    /// assert_eq!(slab.volume(), Some(30_000));
    /// ```
    #[track_caller]
    #[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
    pub fn from_lower_size(lower: impl Into<GridPoint>, size: impl Into<GridSize>) -> Self {
        let lower: GridPoint = lower.into();
        let size: GridSize = size.into();
        fn upper(lower: GridPoint, size: GridSize) -> Option<GridPoint> {
            Some(GridPoint::new(
                lower.x.checked_add_unsigned(size.width)?,
                lower.y.checked_add_unsigned(size.height)?,
                lower.z.checked_add_unsigned(size.depth)?,
            ))
        }
        match upper(lower, size) {
            Some(upper) => Self::from_lower_upper(lower, upper),
            None => panic!(
                "GridAab::from_lower_size: {}",
                GridOverflowError(OverflowKind::PastMaximum {
                    cube: lower.into()
                })
            ),
        }
    }

    /// Constructs the smallest box containing both cubes, which may be given in any order.
    ///
    /// Fails if either cube lies on the maximum coordinate of some axis (so that the box
    /// would have no representable upper bound), or if the box is too big to count.
    ///
    /// ```
    /// # extern crate cubefill_base as cubefill;
    /// use cubefill::math::{Cube, GridAab};
    ///
    /// let aab = GridAab::from_inclusive_corners(Cube::new(2, 0, 5), Cube::new(0, 0, 4)).unwrap();
    /// assert_eq!(aab, GridAab::from_lower_upper([0, 0, 4], [3, 1, 6]));
    /// assert_eq!(aab.volume(), Some(6));
    /// ```
    #[inline]
    pub fn from_inclusive_corners(a: Cube, b: Cube) -> Result<Self, GridOverflowError> {
        let (lower, upper) = Cube::min_max(a, b);
        let upper = upper
            .checked_upper_bounds()
            .ok_or(GridOverflowError(OverflowKind::PastMaximum { cube: upper }))?;
        Self::checked_from_lower_upper(lower.lower_bounds(), upper)
    }

    /// Number of cubes in the box, or [`None`] if that does not fit in a `usize`.
    ///
    /// Only boxes under construction can be uncountable, so for any existing
    /// [`GridAab`] this is [`Some`].
    #[inline]
    pub fn volume(&self) -> Option<usize> {
        let GridSize {
            width,
            height,
            depth,
            ..
        } = self.size();
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(depth as usize)
    }

    /// Whether the box is flat on some axis and so contains no cubes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }

    /// The most negative corner of the box, which is the lower corner of its first cube.
    #[inline]
    pub fn lower_bounds(&self) -> GridPoint {
        self.lower
    }

    /// The most positive corner of the box. No cube in the box has this as its lower corner.
    #[inline]
    pub fn upper_bounds(&self) -> GridPoint {
        self.upper
    }

    /// Extent of the box along each axis, in cubes.
    #[inline]
    pub fn size(&self) -> GridSize {
        // upper >= lower, so the difference is nonnegative even when it overflows `i32`,
        // and reinterpreting the wrapped result as unsigned recovers it exactly.
        size3(
            self.upper.x.wrapping_sub(self.lower.x) as GridSizeCoord,
            self.upper.y.wrapping_sub(self.lower.y) as GridSizeCoord,
            self.upper.z.wrapping_sub(self.lower.z) as GridSizeCoord,
        )
    }

    /// Iterates over every cube in the box, in X-major order.
    #[inline]
    pub fn interior_iter(self) -> GridIter {
        GridIter::new(self)
    }

    /// Whether `cube` is one of the cubes in this box.
    ///
    /// ```
    /// # extern crate cubefill_base as cubefill;
    /// use cubefill::math::{Cube, GridAab};
    ///
    /// let b = GridAab::from_lower_size([4, 4, 4], [6, 6, 6]);
    /// assert!(b.contains_cube(Cube::new(9, 4, 5)));
    /// assert!(!b.contains_cube(Cube::new(10, 4, 5)));
    /// ```
    #[inline]
    pub fn contains_cube(&self, cube: Cube) -> bool {
        let p = cube.lower_bounds();
        (self.lower.x..self.upper.x).contains(&p.x)
            && (self.lower.y..self.upper.y).contains(&p.y)
            && (self.lower.z..self.upper.z).contains(&p.z)
    }
}

impl fmt::Debug for GridAab {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { lower, upper } = self;
        write!(
            f,
            "GridAab({:?}, {:?}, {:?})",
            lower.x..upper.x,
            lower.y..upper.y,
            lower.z..upper.z,
        )
    }
}

/// Error when a [`GridAab`] would be inverted, out of range, or too large to count.
#[derive(Clone, Copy, Debug, displaydoc::Display, Eq, PartialEq)]
#[displaydoc("{0}")]
pub struct GridOverflowError(OverflowKind);

impl core::error::Error for GridOverflowError {}

#[derive(Clone, Copy, Debug, displaydoc::Display, Eq, PartialEq)]
enum OverflowKind {
    /// box lower bounds {lower:?} are above its upper bounds {upper:?}
    Inverted { lower: Cube, upper: Cube },
    /// box would extend past the maximum coordinate from {cube:?}
    PastMaximum { cube: Cube },
    /// box of size {size:?} has too many cubes to count
    Uncountable { size: GridSize },
}
