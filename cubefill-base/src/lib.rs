//! Grid geometry and scheduling hooks shared by the [`cubefill`] engine.
//!
//! This crate exists so that the geometry can be built `no_std`; everything in it is
//! re-exported from [`cubefill`], which is the crate to depend on.
//!
//! [`cubefill`]: https://crates.io/crates/cubefill/

#![no_std]
#![cfg_attr(
    not(test),
    warn(clippy::std_instead_of_core, clippy::std_instead_of_alloc)
)]
#![warn(clippy::missing_inline_in_public_items)]

#[cfg(any(feature = "std", test))]
#[cfg_attr(test, macro_use)]
extern crate std;
#[allow(unused_imports)]
#[macro_use]
extern crate alloc;

/// Re-exported as `cubefill::math`.
pub mod math;

/// Re-exported as `cubefill::util`.
pub mod util;

// `cubefill` re-exports this so its users can name the math types' unit parameters.
#[doc(hidden)]
pub use euclid;
