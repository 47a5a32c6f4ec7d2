use std::sync::Arc;

use arcstr::ArcStr;

use crate::{Material, Quote, ResourceKinds, UserId};

/// An outcome of a fill request which should be reported to the user.
///
/// Notices are structured data; turning them into text (and translating it) is up to the
/// [`NotificationSink`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum FillNotice {
    /// No configured tool has the requested name.
    UnknownTool(ArcStr),
    /// The user has used the named tool as many times as it allows.
    ToolUsedUp(ArcStr),
    /// The selection is missing a corner, or cannot be filled.
    SelectionIncomplete,
    /// The selection exceeds the configured limits.
    SelectionTooLarge {
        /// Number of blocks selected.
        volume: usize,
        /// Largest dimension of the selection.
        max_extent: u32,
    },
    /// A requested material is on the blacklist.
    MaterialNotAllowed(Material),
    /// The request did not name any material with a nonzero share.
    NoMaterials,
    /// The user already has a fill in progress.
    AlreadyRunning,
    /// The price has been calculated and the fill awaits confirmation.
    QuoteReady(Arc<Quote>),
    /// The user does not have enough currency; the fill was abandoned.
    InsufficientFunds,
    /// The user does not have enough of the materials; the fill was abandoned.
    InsufficientItems,
    /// The user tried to confirm or reject, but has no fill waiting.
    NoPendingTask,
    /// The user confirmed and their resources are being checked.
    CheckingResources,
    /// The user was charged and blocks are being placed.
    PlacementStarted {
        /// Number of blocks to be placed.
        blocks: usize,
    },
    /// Every block was placed.
    PlacementDone {
        /// Number of blocks placed.
        applied: usize,
    },
    /// Placement stopped because the world refused an access.
    PlacementFailed {
        /// Number of blocks placed before the failure.
        applied: usize,
        /// Number of blocks not placed.
        remaining: usize,
    },
    /// Placement stopped because the fill was cancelled.
    PlacementCancelled {
        /// Number of blocks placed before stopping.
        applied: usize,
        /// Number of blocks not placed.
        remaining: usize,
    },
    /// The fill was rejected or cancelled before placement began.
    Cancelled,
    /// Pricing could not be completed.
    PricingFailed,
}

impl FillNotice {
    /// Returns the notices reporting that `lacking` resources were insufficient.
    pub fn insufficient(lacking: ResourceKinds) -> impl Iterator<Item = FillNotice> {
        [
            (ResourceKinds::CURRENCY, FillNotice::InsufficientFunds),
            (ResourceKinds::ITEMS, FillNotice::InsufficientItems),
        ]
        .into_iter()
        .filter(move |(kind, _)| lacking.contains(*kind))
        .map(|(_, notice)| notice)
    }
}

/// Receives [`FillNotice`]s for delivery to users.
///
/// Notifications must not block; implementations should queue them if delivery is slow.
pub trait NotificationSink: Send + Sync {
    /// Delivers `notice` to `user`.
    fn notify(&self, user: UserId, notice: FillNotice);
}

impl<T: ?Sized + NotificationSink> NotificationSink for Arc<T> {
    fn notify(&self, user: UserId, notice: FillNotice) {
        (**self).notify(user, notice)
    }
}

/// A [`NotificationSink`] which only logs notices.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, user: UserId, notice: FillNotice) {
        log::info!("notice for {user}: {notice:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools as _;

    #[test]
    fn insufficient_notices() {
        assert_eq!(
            FillNotice::insufficient(ResourceKinds::all()).collect_vec(),
            vec![FillNotice::InsufficientFunds, FillNotice::InsufficientItems]
        );
        assert_eq!(
            FillNotice::insufficient(ResourceKinds::ITEMS).collect_vec(),
            vec![FillNotice::InsufficientItems]
        );
        assert_eq!(FillNotice::insufficient(ResourceKinds::empty()).count(), 0);
    }

    #[test]
    fn log_sink_through_shared_handle() {
        let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);
        for notice in [
            FillNotice::UnknownTool("shovel".into()),
            FillNotice::PlacementDone { applied: 8 },
            FillNotice::Cancelled,
        ] {
            Arc::clone(&sink).notify(UserId(7), notice);
        }
        LogSink.notify(UserId(7), FillNotice::NoPendingTask);
    }
}
