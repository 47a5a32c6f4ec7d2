//! Interface to the host's accounting of currency and items.

use core::fmt;
use std::sync::Arc;

use futures_core::future::BoxFuture;

use crate::{Distribution, Price, UserId};

// -------------------------------------------------------------------------------------------------

bitflags::bitflags! {
    /// Kinds of resources a fill may require the user to have, and be charged.
    ///
    /// *Note: We make no guarantees that the numeric value of flags will stay the same
    /// across versions*; please treat this as a set of named values only.
    #[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ResourceKinds: u8 {
        /// The quoted total price, paid from the user's balance.
        const CURRENCY = 1 << 0;
        /// The blocks themselves, taken from the user's inventory.
        const ITEMS = 1 << 1;
    }
}

/// Lists the kinds in words, such as “currency and items”.
impl fmt::Display for ResourceKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(Self::CURRENCY), self.contains(Self::ITEMS)) {
            (true, true) => f.write_str("currency and items"),
            (true, false) => f.write_str("currency"),
            (false, true) => f.write_str("items"),
            (false, false) => f.write_str("nothing"),
        }
    }
}

/// Which resources are checked at each point in a fill's life.
///
/// When placement starts, the union of all three sets is debited.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[expect(clippy::exhaustive_structs)]
pub struct ResourcePolicy {
    /// Checked when the quote has been calculated, before it is shown to the user.
    pub at_quote: ResourceKinds,
    /// Checked when the user confirms.
    pub at_confirm: ResourceKinds,
    /// Checked immediately before the debit and the start of placement.
    pub at_start: ResourceKinds,
}

impl ResourcePolicy {
    /// Returns the resources which are debited when placement starts.
    pub fn debited(&self) -> ResourceKinds {
        self.at_quote | self.at_confirm | self.at_start
    }

    /// Returns the resources checked at the given checkpoint.
    pub fn at(&self, checkpoint: Checkpoint) -> ResourceKinds {
        match checkpoint {
            Checkpoint::Quote => self.at_quote,
            Checkpoint::Confirm => self.at_confirm,
            Checkpoint::Start => self.at_start,
        }
    }
}

/// Checks currency when quoting, items on confirmation, and currency again before starting.
impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            at_quote: ResourceKinds::CURRENCY,
            at_confirm: ResourceKinds::ITEMS,
            at_start: ResourceKinds::CURRENCY,
        }
    }
}

/// A point in a fill's life at which resources are checked.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum Checkpoint {
    /// After the price has been calculated.
    Quote,
    /// When the user confirms.
    Confirm,
    /// Immediately before the debit.
    Start,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Checkpoint::Quote => "quoting",
            Checkpoint::Confirm => "confirming",
            Checkpoint::Start => "starting placement",
        })
    }
}

// -------------------------------------------------------------------------------------------------

/// What a fill costs: the resources to consult, the priced total, and the blocks used.
#[derive(Clone, Debug, Eq, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Charge {
    /// Which of the following fields the ledger should consider.
    pub kinds: ResourceKinds,
    /// The total price, relevant if `kinds` contains [`ResourceKinds::CURRENCY`].
    pub price: Price,
    /// The blocks of each material, relevant if `kinds` contains [`ResourceKinds::ITEMS`].
    pub materials: Arc<Distribution>,
}

impl Charge {
    /// Returns a copy of this charge which consults only the given kinds.
    #[must_use]
    pub fn with_kinds(&self, kinds: ResourceKinds) -> Self {
        Self {
            kinds,
            ..self.clone()
        }
    }
}

/// The host's accounting of users' currency and items.
///
/// Implementations must make [`debit()`](Self::debit) atomic: either every resource in the
/// charge is taken, or none is.
pub trait ResourceLedger: Send + Sync {
    /// Reports whether `account` currently has everything in `charge`.
    ///
    /// This may consult a remote service, so it is asynchronous. Its answer is advisory;
    /// only [`debit()`](Self::debit) actually settles the charge.
    fn has<'a>(&'a self, account: UserId, charge: &'a Charge) -> BoxFuture<'a, bool>;

    /// Takes everything in `charge` from `account`, or nothing if anything is lacking.
    ///
    /// This is called from the context which owns the world, and must not block for long.
    fn debit(&self, account: UserId, charge: &Charge) -> Result<(), DebitError>;
}

impl<T: ?Sized + ResourceLedger> ResourceLedger for Arc<T> {
    fn has<'a>(&'a self, account: UserId, charge: &'a Charge) -> BoxFuture<'a, bool> {
        (**self).has(account, charge)
    }
    fn debit(&self, account: UserId, charge: &Charge) -> Result<(), DebitError> {
        (**self).debit(account, charge)
    }
}

/// Error from [`ResourceLedger::debit()`]; nothing was taken.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("account lacks {lacking}")]
#[non_exhaustive]
pub struct DebitError {
    /// The kinds of resource that were insufficient.
    pub lacking: ResourceKinds,
}

impl DebitError {
    #[allow(missing_docs)]
    pub fn new(lacking: ResourceKinds) -> Self {
        Self { lacking }
    }
}

/// Error when a user does not have the resources a fill requires.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("insufficient {lacking} when {checkpoint}")]
#[non_exhaustive]
pub struct InsufficientResourceError {
    /// Where in the fill's life the check failed.
    pub checkpoint: Checkpoint,
    /// The kinds of resource found to be insufficient.
    pub lacking: ResourceKinds,
}

impl InsufficientResourceError {
    #[allow(missing_docs)]
    pub fn new(checkpoint: Checkpoint, lacking: ResourceKinds) -> Self {
        Self {
            checkpoint,
            lacking,
        }
    }
}

/// Asks the ledger about each kind in `charge` separately, and returns those `account` lacks.
pub async fn lacking_resources(
    ledger: &dyn ResourceLedger,
    account: UserId,
    charge: &Charge,
) -> ResourceKinds {
    let mut lacking = ResourceKinds::empty();
    for kind in charge.kinds.iter() {
        if !ledger.has(account, &charge.with_kinds(kind)).await {
            lacking |= kind;
        }
    }
    lacking
}
