use core::iter::FusedIterator;

use crate::math::{Cube, GridAab, GridPoint, GridSizeCoord};

/// Iterator over every cube in a [`GridAab`], produced by [`GridAab::interior_iter()`].
///
/// Cubes come in X-major order: Z varies fastest, then Y, then X.
/// The iterator is a position within that order plus the box it walks, so
/// cloning it (or asking the box for a fresh one) restarts the sequence from the
/// same place without recomputing anything.
#[derive(Clone, Debug)]
pub struct GridIter {
    lower: GridPoint,
    /// Extent of the box on the Y and Z axes; X is implied by `end`.
    height: GridSizeCoord,
    depth: GridSizeCoord,
    /// Linear index of the next cube to produce.
    next: u128,
    /// One past the linear index of the last cube.
    end: u128,
}

impl GridIter {
    #[inline]
    pub(in crate::math) fn new(bounds: GridAab) -> Self {
        let size = bounds.size();
        Self {
            lower: bounds.lower_bounds(),
            height: size.height,
            depth: size.depth,
            next: 0,
            end: u128::from(size.width) * u128::from(size.height) * u128::from(size.depth),
        }
    }

    fn cube_at(&self, index: u128) -> Cube {
        let depth = u128::from(self.depth);
        let plane = u128::from(self.height) * depth;
        // Each offset is less than the box's extent on its axis, so it fits in a
        // `GridSizeCoord` and adding it to the lower bound stays inside the box.
        let dx = (index / plane) as GridSizeCoord;
        let dy = (index % plane / depth) as GridSizeCoord;
        let dz = (index % depth) as GridSizeCoord;
        Cube::new(
            self.lower.x.wrapping_add_unsigned(dx),
            self.lower.y.wrapping_add_unsigned(dy),
            self.lower.z.wrapping_add_unsigned(dz),
        )
    }

    fn remaining(&self) -> u128 {
        self.end - self.next
    }
}

impl Iterator for GridIter {
    type Item = Cube;

    #[inline]
    fn next(&mut self) -> Option<Cube> {
        if self.next >= self.end {
            return None;
        }
        let cube = self.cube_at(self.next);
        self.next += 1;
        Some(cube)
    }

    #[allow(clippy::missing_inline_in_public_items)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }

    #[allow(clippy::missing_inline_in_public_items)]
    fn nth(&mut self, n: usize) -> Option<Cube> {
        self.next = self.end.min(self.next.saturating_add(n as u128));
        self.next()
    }
}

/// Exact for every box a [`GridAab`] can represent, since construction checks that the
/// volume fits in `usize`.
impl ExactSizeIterator for GridIter {}

impl FusedIterator for GridIter {}
