use core::fmt;

use crate::math::{Cube, GridAab, GridIter, GridOverflowError, GridSize, GridSizeCoord};

// -------------------------------------------------------------------------------------------------

/// Identifies one of the two corners of a [`Selection`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum Corner {
    #[allow(missing_docs)]
    First,
    #[allow(missing_docs)]
    Second,
}

/// The region a user has marked, as two opposite corners which are set independently.
///
/// Both corners are *inclusive*: the selected region includes the cubes at both corners.
/// They may be set in either order and either may be the “larger” one.
///
/// ```
/// use cubefill::{Selection, math::Cube};
///
/// let mut selection = Selection::new();
/// selection.set_second(Cube::new(1, 1, 1));
/// assert!(!selection.is_valid());
///
/// selection.set_first(Cube::new(0, 0, 0));
/// assert_eq!(selection.cuboid().unwrap().volume(), 8);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Selection {
    first: Option<Cube>,
    second: Option<Cube>,
}

impl Selection {
    /// Constructs a [`Selection`] with neither corner set.
    pub const fn new() -> Self {
        Self {
            first: None,
            second: None,
        }
    }

    /// Sets the first corner, replacing any previous value.
    pub fn set_first(&mut self, cube: Cube) {
        self.first = Some(cube);
    }

    /// Sets the second corner, replacing any previous value.
    pub fn set_second(&mut self, cube: Cube) {
        self.second = Some(cube);
    }

    /// Sets the specified corner, replacing any previous value.
    pub fn set_corner(&mut self, corner: Corner, cube: Cube) {
        match corner {
            Corner::First => self.set_first(cube),
            Corner::Second => self.set_second(cube),
        }
    }

    /// Returns the specified corner, if it has been set.
    pub fn corner(&self, corner: Corner) -> Option<Cube> {
        match corner {
            Corner::First => self.first,
            Corner::Second => self.second,
        }
    }

    /// Unsets both corners, as when the user begins a new selection.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Returns whether both corners are set.
    pub fn is_valid(&self) -> bool {
        self.first.is_some() && self.second.is_some()
    }

    /// Returns the region between the two corners.
    ///
    /// Fails if either corner is unset, or if the region cannot be represented
    /// (a corner at [`i32::MAX`] on some axis, or a volume exceeding [`usize::MAX`]).
    pub fn cuboid(&self) -> Result<Cuboid, InvalidSelectionError> {
        match (self.first, self.second) {
            (Some(first), Some(second)) => Cuboid::from_corners(first, second),
            (None, _) => Err(InvalidSelectionError::Incomplete {
                missing: Corner::First,
            }),
            (Some(_), None) => Err(InvalidSelectionError::Incomplete {
                missing: Corner::Second,
            }),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A nonempty box of cubes spanning two inclusive corners.
///
/// The blocks of a cuboid are always enumerated in the same order, so a cuboid can stand in
/// for the list of its blocks.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Cuboid {
    bounds: GridAab,
    /// Cached volume of `bounds`, which is known to fit.
    volume: usize,
}

impl Cuboid {
    /// Constructs the cuboid which includes both cubes and everything between them.
    pub fn from_corners(a: Cube, b: Cube) -> Result<Self, InvalidSelectionError> {
        let bounds =
            GridAab::from_inclusive_corners(a, b).map_err(InvalidSelectionError::OutOfRange)?;
        match bounds.volume() {
            Some(volume) => Ok(Self { bounds, volume }),
            // from_inclusive_corners() checks the volume.
            None => unreachable!("uncountable GridAab {bounds:?}"),
        }
    }

    /// Returns the bounds of this cuboid as a half-open box.
    pub fn bounds(&self) -> GridAab {
        self.bounds
    }

    /// Returns the number of blocks in this cuboid. This is never zero.
    pub fn volume(&self) -> usize {
        self.volume
    }

    /// Returns the size of this cuboid along each axis, in blocks.
    pub fn size(&self) -> GridSize {
        self.bounds.size()
    }

    /// Returns the largest of the dimensions of [`Self::size()`].
    pub fn max_extent(&self) -> GridSizeCoord {
        let size = self.size();
        size.width.max(size.height).max(size.depth)
    }

    /// Returns an iterator over every block in the cuboid, each exactly once.
    ///
    /// The order is fixed for a given cuboid; cloning the iterator or calling this again
    /// restarts the same sequence.
    pub fn blocks(&self) -> GridIter {
        self.bounds.interior_iter()
    }
}

impl fmt::Debug for Cuboid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cuboid").field(&self.bounds).finish()
    }
}

/// Error from [`Selection::cuboid()`] when the selection does not describe a usable region.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidSelectionError {
    /// A corner has not been set yet.
    #[error("the {missing:?} corner of the selection has not been set")]
    Incomplete {
        /// The first corner found to be missing.
        missing: Corner,
    },

    /// The region is at the edge of the coordinate range, or too large to count.
    #[error("the selected region is outside the representable range")]
    OutOfRange(#[source] GridOverflowError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools as _;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn incomplete() {
        let mut selection = Selection::new();
        assert_eq!(
            selection.cuboid(),
            Err(InvalidSelectionError::Incomplete {
                missing: Corner::First
            })
        );
        selection.set_corner(Corner::First, Cube::ORIGIN);
        assert_eq!(
            selection.cuboid(),
            Err(InvalidSelectionError::Incomplete {
                missing: Corner::Second
            })
        );
        selection.set_corner(Corner::Second, Cube::ORIGIN);
        assert!(selection.is_valid());

        selection.clear();
        assert!(!selection.is_valid());
        assert_eq!(selection.corner(Corner::First), None);
    }

    #[test]
    fn last_write_wins() {
        let mut selection = Selection::new();
        selection.set_first(Cube::new(9, 9, 9));
        selection.set_first(Cube::new(0, 0, 0));
        selection.set_second(Cube::new(0, 0, 2));
        let cuboid = selection.cuboid().unwrap();
        assert_eq!(cuboid.volume(), 3);
        assert_eq!(cuboid.bounds(), GridAab::from_lower_upper([0, 0, 0], [1, 1, 3]));
    }

    #[rstest]
    #[case([0, 0, 0], [1, 1, 1], 8)]
    #[case([1, 1, 1], [0, 0, 0], 8)]
    #[case([5, -3, 2], [-1, 4, 2], 7 * 8)]
    #[case([-7, -7, -7], [-7, -7, -7], 1)]
    #[case([0, 10, 0], [9, 0, 0], 10 * 11)]
    fn enumerates_inclusive_box(#[case] a: [i32; 3], #[case] b: [i32; 3], #[case] expected: usize) {
        for (first, second) in [(a, b), (b, a)] {
            let mut selection = Selection::new();
            selection.set_first(first.into());
            selection.set_second(second.into());
            let cuboid = selection.cuboid().unwrap();

            let blocks = cuboid.blocks().collect::<Vec<Cube>>();
            assert_eq!(blocks.len(), expected);
            assert_eq!(cuboid.volume(), expected);
            assert!(blocks.iter().all_unique());
            for corner in [first, second] {
                assert!(blocks.contains(&Cube::from(corner)));
            }
            // Every block lies within the per-axis min/max of the corners.
            let (lower, upper) = Cube::min_max(first.into(), second.into());
            assert!(blocks.iter().all(|c| {
                (lower.x..=upper.x).contains(&c.x)
                    && (lower.y..=upper.y).contains(&c.y)
                    && (lower.z..=upper.z).contains(&c.z)
            }));
        }
    }

    #[test]
    fn same_sequence_regardless_of_corner_order() {
        let a = Cuboid::from_corners(Cube::new(3, 0, -2), Cube::new(0, 2, 1)).unwrap();
        let b = Cuboid::from_corners(Cube::new(0, 2, 1), Cube::new(3, 0, -2)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.blocks().collect_vec(), b.blocks().collect_vec());
    }

    #[test]
    fn size_and_extent() {
        let cuboid = Cuboid::from_corners(Cube::new(0, 0, 0), Cube::new(4, 1, 9)).unwrap();
        assert_eq!(cuboid.size(), GridSize::new(5, 2, 10));
        assert_eq!(cuboid.max_extent(), 10);
    }

    #[test]
    fn out_of_range() {
        assert!(matches!(
            Cuboid::from_corners(Cube::new(0, 0, 0), Cube::new(0, i32::MAX, 0)),
            Err(InvalidSelectionError::OutOfRange(_))
        ));
        // Volume too large to count.
        assert!(matches!(
            Cuboid::from_corners(
                Cube::new(i32::MIN, i32::MIN, i32::MIN),
                Cube::new(i32::MAX - 1, i32::MAX - 1, i32::MAX - 1)
            ),
            Err(InvalidSelectionError::OutOfRange(_))
        ));
    }
}
