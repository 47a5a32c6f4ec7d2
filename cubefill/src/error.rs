use arcstr::ArcStr;

use crate::util::BackgroundUnavailable;
use crate::{
    EmptyDistributionError, InsufficientResourceError, InvalidSelectionError,
    InvalidTaskStateError, Material, PlacementPartialFailure, TaskAlreadyActiveError,
};

/// Any of the reasons a fill request may fail.
///
/// Every operation of [`FillService`](crate::FillService) reports failure with this type,
/// and most [`FillTask`](crate::FillTask) operations do too.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum FillError {
    #[allow(missing_docs)]
    #[error(transparent)]
    InvalidSelection(#[from] InvalidSelectionError),

    #[allow(missing_docs)]
    #[error(transparent)]
    EmptyDistribution(#[from] EmptyDistributionError),

    #[allow(missing_docs)]
    #[error(transparent)]
    TaskAlreadyActive(#[from] TaskAlreadyActiveError),

    #[allow(missing_docs)]
    #[error(transparent)]
    InvalidTaskState(#[from] InvalidTaskStateError),

    #[allow(missing_docs)]
    #[error(transparent)]
    InsufficientResource(#[from] InsufficientResourceError),

    #[allow(missing_docs)]
    #[error(transparent)]
    Placement(#[from] PlacementPartialFailure),

    /// The background work of pricing was lost.
    #[error(transparent)]
    BackgroundUnavailable(#[from] BackgroundUnavailable),

    /// A requested material is on the blacklist.
    #[error("material '{0}' may not be used to fill")]
    MaterialNotAllowed(Material),

    /// The selected region exceeds the configured limits.
    #[error("selection of {volume} blocks spanning {max_extent} is larger than allowed")]
    SelectionTooLarge {
        /// Number of blocks in the region.
        volume: usize,
        /// Largest dimension of the region.
        max_extent: u32,
    },

    /// No configured tool has the requested name.
    #[error("there is no fill tool named '{0}'")]
    UnknownTool(ArcStr),

    /// The user has used up the requested tool.
    #[error("fill tool '{tool}' may only be used {max_use} times")]
    ToolUsedUp {
        /// Name of the tool.
        tool: ArcStr,
        /// Number of uses allowed.
        max_use: u32,
    },

    /// The user has no fill awaiting confirmation.
    #[error("there is no fill waiting to be confirmed")]
    NoPendingTask,

    /// The task was cancelled while the operation was in progress.
    #[error("the fill was cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Cube;
    use crate::util::ErrorChain;
    use crate::{Checkpoint, ResourceKinds, SurfaceError};

    #[test]
    fn messages() {
        assert_eq!(
            FillError::from(InsufficientResourceError::new(
                Checkpoint::Confirm,
                ResourceKinds::ITEMS
            ))
            .to_string(),
            "insufficient items when confirming"
        );
        assert_eq!(
            FillError::MaterialNotAllowed("bedrock".into()).to_string(),
            "material 'bedrock' may not be used to fill"
        );
        assert_eq!(
            FillError::ToolUsedUp {
                tool: "golden_wand".into(),
                max_use: 5
            }
            .to_string(),
            "fill tool 'golden_wand' may only be used 5 times"
        );
    }

    #[test]
    fn placement_failure_chain() {
        let error = FillError::from(PlacementPartialFailure {
            applied: 3,
            remaining: 5,
            cause: SurfaceError::Unavailable(Cube::new(1, 2, 3)),
        });
        assert_eq!(
            ErrorChain(&error).to_string(),
            "placement stopped after 3 blocks with 5 remaining\n\n\
            Caused by:\n    (+1, +2, +3) is not currently available"
        );
    }
}
