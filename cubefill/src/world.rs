use hashbrown::HashMap;

use crate::Material;
use crate::math::{Cube, GridAab};

// -------------------------------------------------------------------------------------------------

/// Access to the blocks of the host's world, as needed to place a fill.
///
/// The placement engine reads every position in a chunk with [`get()`](Self::get) before
/// writing any of them with [`set()`](Self::set), so a surface which reports errors from
/// `get()` for unavailable areas prevents partial chunks.
pub trait WorldSurface {
    /// Returns the material currently at `cube`, or [`None`] if it is empty.
    fn get(&self, cube: Cube) -> Result<Option<Material>, SurfaceError>;

    /// Replaces the block at `cube` with `material`.
    fn set(&mut self, cube: Cube, material: &Material) -> Result<(), SurfaceError>;
}

impl<T: ?Sized + WorldSurface> WorldSurface for &mut T {
    fn get(&self, cube: Cube) -> Result<Option<Material>, SurfaceError> {
        (**self).get(cube)
    }
    fn set(&mut self, cube: Cube, material: &Material) -> Result<(), SurfaceError> {
        (**self).set(cube, material)
    }
}

/// Error from a [`WorldSurface`] operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SurfaceError {
    /// The position is outside the world's bounds, and can never be accessed.
    #[error("{0:?} is outside the world")]
    OutOfBounds(Cube),
    /// The position is within the world but cannot be accessed now (for example, because
    /// that area is not loaded).
    #[error("{0:?} is not currently available")]
    Unavailable(Cube),
}

// -------------------------------------------------------------------------------------------------

/// A [`WorldSurface`] which stores blocks in memory.
///
/// Besides being a complete world for small embeddings, it can mark regions unavailable
/// and counts writes, which makes it useful for testing placement.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorld {
    bounds: Option<GridAab>,
    blocks: HashMap<Cube, Material>,
    unavailable: Vec<GridAab>,
    set_count: usize,
}

impl MemoryWorld {
    /// Constructs an empty world of unlimited extent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an empty world in which only cubes within `bounds` may be accessed.
    pub fn with_bounds(bounds: GridAab) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    /// Makes `region` report [`SurfaceError::Unavailable`] until
    /// [`set_available()`](Self::set_available) is called.
    pub fn set_unavailable(&mut self, region: GridAab) {
        self.unavailable.push(region);
    }

    /// Makes every region accessible again.
    pub fn set_available(&mut self) {
        self.unavailable.clear();
    }

    /// Returns the number of non-empty blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of successful [`WorldSurface::set()`] calls made so far.
    pub fn set_count(&self) -> usize {
        self.set_count
    }

    /// Iterates over all non-empty blocks, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (Cube, &Material)> + '_ {
        self.blocks.iter().map(|(&cube, material)| (cube, material))
    }

    fn check(&self, cube: Cube) -> Result<(), SurfaceError> {
        if let Some(bounds) = self.bounds {
            if !bounds.contains_cube(cube) {
                return Err(SurfaceError::OutOfBounds(cube));
            }
        }
        if self
            .unavailable
            .iter()
            .any(|region| region.contains_cube(cube))
        {
            return Err(SurfaceError::Unavailable(cube));
        }
        Ok(())
    }
}

impl WorldSurface for MemoryWorld {
    fn get(&self, cube: Cube) -> Result<Option<Material>, SurfaceError> {
        self.check(cube)?;
        Ok(self.blocks.get(&cube).cloned())
    }

    fn set(&mut self, cube: Cube, material: &Material) -> Result<(), SurfaceError> {
        self.check(cube)?;
        self.blocks.insert(cube, material.clone());
        self.set_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set() {
        let mut world = MemoryWorld::new();
        let cube = Cube::new(1, -2, 3);
        assert_eq!(world.get(cube), Ok(None));
        world.set(cube, &"stone".into()).unwrap();
        assert_eq!(world.get(cube), Ok(Some("stone".into())));
        assert_eq!(world.block_count(), 1);
        assert_eq!(world.set_count(), 1);
    }

    #[test]
    fn bounds_and_availability() {
        let mut world = MemoryWorld::with_bounds(GridAab::from_lower_size([0, 0, 0], [4, 4, 4]));
        let outside = Cube::new(4, 0, 0);
        assert_eq!(world.get(outside), Err(SurfaceError::OutOfBounds(outside)));

        world.set_unavailable(GridAab::from_lower_size([0, 0, 0], [1, 1, 1]));
        assert_eq!(
            world.set(Cube::ORIGIN, &"stone".into()),
            Err(SurfaceError::Unavailable(Cube::ORIGIN))
        );
        assert_eq!(world.set_count(), 0);

        world.set_available();
        world.set(Cube::ORIGIN, &"stone".into()).unwrap();
        assert_eq!(world.iter().count(), 1);
    }
}
