//! Integer grid geometry used to address blocks.
//!
//! These types are defined in the helper crate `cubefill-base` and re-exported here.

#[doc(inline)]
pub use cubefill_base::math::*;
