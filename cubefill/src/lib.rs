//! Cubefill is an engine for “fill this region” requests in worlds made of cubical blocks.
//!
//! A user marks a cuboid region, asks for it to be filled with a weighted mix of
//! materials, is shown a price, and confirms or rejects it. On confirmation the price is
//! settled and the blocks are placed a bounded chunk at a time, so that the host
//! environment is never stalled by a large fill.
//!
//! ## Overview
//!
//! * [`Selection`] holds the two corners a user has marked and produces a [`Cuboid`].
//! * [`Distribution`] turns a list of [`MaterialPercent`] shares and a block count into
//!   exact per-material counts, and then into a deterministic per-block assignment.
//! * [`PriceCatalog`] prices a distribution, producing a [`Quote`].
//! * [`FillTask`] is the state machine which carries one request from pricing, through
//!   confirmation and settlement, to placement. Its states are listed by [`FillStatus`].
//! * [`PlacementJob`] applies the assignment to a [`WorldSurface`] in chunks, yielding
//!   to the host's [`Executor`] between them.
//! * [`TaskRegistry`] ensures that each user has at most one active task.
//! * [`FillService`] ties all of the above together with a [`ResourceLedger`] (money and
//!   items) and a [`NotificationSink`] (outcomes reported to the user).
//!
//! The world, the ledger, the notification sink, and the executor are all provided by
//! the host application through traits; this crate does no I/O of its own, and never
//! installs a logger (it reports through the [`log`] facade).
//!
//! ## Package features
//!
//! This package defines the following feature flags:
//!
//! * `"serde"`:
//!   Enables deserialization of configuration: [`PriceCatalog`] via [`CatalogConfig`],
//!   and [`FillConfig`].

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

// -------------------------------------------------------------------------------------------------

pub mod math;
pub mod util;

mod config;
pub use config::*;
mod distribution;
pub use distribution::*;
mod error;
pub use error::*;
mod ledger;
pub use ledger::*;
mod material;
pub use material::*;
mod notice;
pub use notice::*;
mod placement;
pub use placement::*;
mod price;
pub use price::*;
mod pricing;
pub use pricing::*;
mod registry;
pub use registry::*;
mod selection;
pub use selection::*;
mod service;
pub use service::*;
mod task;
pub use task::*;
mod world;
pub use world::*;

#[doc(hidden)] // Exported only for use by tests
pub mod testing;

#[doc(no_inline)]
pub use util::Executor;

/// Re-export the version of the `euclid` vector math library we're using.
pub use cubefill_base::euclid;
