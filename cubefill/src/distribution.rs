use std::ops::Range;
use std::sync::Arc;

use rand::SeedableRng as _;
use rand::seq::SliceRandom as _;

use crate::{Material, MaterialPercent};

// -------------------------------------------------------------------------------------------------

/// The number of blocks of each material that make up a fill.
///
/// Materials are kept in the order they were first given, and a material whose share was
/// zero is still present with a count of zero.
///
/// ```
/// use cubefill::{Distribution, Material, MaterialPercent, Percent};
///
/// let distribution = Distribution::compute(
///     &[
///         MaterialPercent::new("stone", Percent::whole(75).unwrap()),
///         MaterialPercent::new("dirt", Percent::whole(25).unwrap()),
///     ],
///     8,
/// )
/// .unwrap();
///
/// assert_eq!(distribution.count(&Material::from("stone")), Some(6));
/// assert_eq!(distribution.count(&Material::from("dirt")), Some(2));
/// assert_eq!(distribution.total(), 8);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Distribution {
    entries: Vec<(Material, usize)>,
}

impl Distribution {
    /// Divides `block_count` blocks among the given materials according to their shares.
    ///
    /// * Each material receives at least `floor(share / total_share * block_count)` blocks.
    /// * The blocks left over after that are given out one each, to materials in order of
    ///   descending share, with ties going to the material listed first.
    /// * The counts always sum to exactly `block_count`.
    ///
    /// Repeated materials are treated as one entry whose share is the sum of theirs.
    ///
    /// Fails if there are no materials, no material has a nonzero share, or `block_count`
    /// is zero.
    pub fn compute(
        percents: &[MaterialPercent],
        block_count: usize,
    ) -> Result<Self, EmptyDistributionError> {
        if percents.is_empty() {
            return Err(EmptyDistributionError::NoMaterials);
        }
        if block_count == 0 {
            return Err(EmptyDistributionError::NoBlocks);
        }

        // Merge duplicates, preserving order of first appearance.
        let mut shares: Vec<(Material, u64)> = Vec::with_capacity(percents.len());
        for mp in percents {
            let share = u64::from(mp.percent.hundredths());
            match shares.iter_mut().find(|(m, _)| *m == mp.material) {
                Some((_, existing)) => *existing += share,
                None => shares.push((mp.material.clone(), share)),
            }
        }

        let total_share: u64 = shares.iter().map(|&(_, share)| share).sum();
        if total_share == 0 {
            return Err(EmptyDistributionError::NoPositiveShare);
        }

        // Floor of each proportional count. u128 cannot overflow: share ≤ 2^64, count ≤ 2^64.
        let n = block_count as u128;
        let mut entries: Vec<(Material, usize)> = shares
            .iter()
            .map(|(material, share)| {
                let count = u128::from(*share) * n / u128::from(total_share);
                // count ≤ block_count, so it fits.
                (material.clone(), count as usize)
            })
            .collect();

        let assigned: usize = entries.iter().map(|&(_, count)| count).sum();
        let remainder = block_count - assigned;
        if remainder > 0 {
            // Stable sort by descending share keeps input order among ties.
            let mut order: Vec<usize> = (0..shares.len()).collect();
            order.sort_by(|&a, &b| shares[b].1.cmp(&shares[a].1));
            // The remainder is less than the number of positive-share materials, because each
            // of them lost less than one block to flooring; so no zero share receives a block.
            for &index in order.iter().take(remainder) {
                entries[index].1 += 1;
            }
        }

        Ok(Self { entries })
    }

    /// Constructs a [`Distribution`] from explicit counts.
    ///
    /// Repeated materials have their counts summed.
    pub fn from_counts(counts: impl IntoIterator<Item = (Material, usize)>) -> Self {
        let mut entries: Vec<(Material, usize)> = Vec::new();
        for (material, count) in counts {
            match entries.iter_mut().find(|(m, _)| *m == material) {
                Some((_, existing)) => *existing += count,
                None => entries.push((material, count)),
            }
        }
        Self { entries }
    }

    /// Returns the number of blocks assigned to `material`, or [`None`] if it is not part of
    /// this distribution at all.
    pub fn count(&self, material: &Material) -> Option<usize> {
        self.entries
            .iter()
            .find(|(m, _)| m == material)
            .map(|&(_, count)| count)
    }

    /// Returns the total number of blocks.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|&(_, count)| count).sum()
    }

    /// Returns the number of distinct materials, including those with a count of zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over materials and their counts, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Material, usize)> + '_ {
        self.entries.iter().map(|(material, count)| (material, *count))
    }

    /// Chooses which material each block will receive.
    ///
    /// The result has exactly [`total()`](Self::total) elements, containing each material
    /// exactly as many times as its count, in an order which is shuffled but entirely
    /// determined by `seed`.
    pub fn assign(&self, seed: u64) -> Assignment {
        let palette: Arc<[Material]> = self.entries.iter().map(|(m, _)| m.clone()).collect();
        let mut indices: Vec<u32> = Vec::with_capacity(self.total());
        for (index, &(_, count)) in self.entries.iter().enumerate() {
            // There cannot be more than u32::MAX materials in practice; each needs an allocation.
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            indices.extend(core::iter::repeat_n(index, count));
        }
        indices.shuffle(&mut rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed));
        Assignment { palette, indices }
    }
}

/// Error from [`Distribution::compute()`] when there is nothing to distribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum EmptyDistributionError {
    /// No materials were given.
    #[error("no materials were specified")]
    NoMaterials,
    /// Every material had a share of zero.
    #[error("every material has a share of 0%")]
    NoPositiveShare,
    /// There are no blocks to fill.
    #[error("there are no blocks to fill")]
    NoBlocks,
}

// -------------------------------------------------------------------------------------------------

/// The material chosen for each block of a fill, in block order.
///
/// Produced by [`Distribution::assign()`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assignment {
    palette: Arc<[Material]>,
    indices: Vec<u32>,
}

impl Assignment {
    /// Returns the material for the block at position `index` in the fill order.
    pub fn get(&self, index: usize) -> Option<&Material> {
        let palette_index = *self.indices.get(index)?;
        self.palette.get(palette_index as usize)
    }

    /// Returns the number of blocks assigned.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over the materials in block order.
    pub fn iter(&self) -> impl Iterator<Item = &Material> + '_ {
        self.range(0..self.len())
    }

    /// Iterates over the materials of the blocks at positions `range` in block order.
    /// Positions past the end are skipped.
    pub fn range(&self, range: Range<usize>) -> impl Iterator<Item = &Material> + '_ {
        let end = range.end.min(self.indices.len());
        let start = range.start.min(end);
        self.indices[start..end]
            .iter()
            .filter_map(|&i| self.palette.get(i as usize))
    }
}
