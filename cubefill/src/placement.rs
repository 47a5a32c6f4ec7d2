//! Applying a fill to the world in bounded chunks.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::math::{Cube, GridIter};
use crate::util::{ErrorChain, Executor};
use crate::{Assignment, FillTask, Material, SurfaceError, WorldSurface};

// -------------------------------------------------------------------------------------------------

/// Number of blocks placed per chunk when not otherwise configured.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(500).unwrap();

/// Shared flag by which a placement in progress is asked to stop.
///
/// Clones share the same flag. Once set, it cannot be unset.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[allow(missing_docs)]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Places the materials of an [`Assignment`] at a sequence of cubes, a chunk at a time.
///
/// Each call to [`step()`](Self::step) handles one chunk in two phases: first every
/// position in the chunk is read, and only if all of those reads succeed is anything
/// written. Between chunks, the placement may be cancelled through its [`CancelFlag`];
/// chunks already placed stay placed.
#[derive(Debug)]
pub struct Placement<I = GridIter> {
    blocks: I,
    assignment: Arc<Assignment>,
    chunk_size: NonZeroUsize,
    cancel: CancelFlag,

    total: usize,
    applied: usize,
    outcome: Option<PlacementOutcome>,
    chunk_buffer: Vec<Cube>,
}

impl<I: ExactSizeIterator<Item = Cube>> Placement<I> {
    /// Prepares to place `assignment`'s materials at `blocks`, pairing them in order.
    ///
    /// If one sequence is longer than the other, its excess elements are ignored.
    pub fn new(
        blocks: I,
        assignment: Arc<Assignment>,
        chunk_size: NonZeroUsize,
        cancel: CancelFlag,
    ) -> Self {
        let total = blocks.len().min(assignment.len());
        Self {
            blocks,
            assignment,
            chunk_size,
            cancel,
            total,
            applied: 0,
            outcome: None,
            chunk_buffer: Vec::with_capacity(chunk_size.get().min(total)),
        }
    }

    /// Number of blocks placed so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Number of blocks not yet placed.
    pub fn remaining(&self) -> usize {
        self.total - self.applied
    }

    /// Number of blocks this placement covers.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of chunks needed to place every block.
    pub fn chunk_count(&self) -> usize {
        self.total.div_ceil(self.chunk_size.get())
    }

    /// Returns the outcome, if the placement has finished.
    pub fn outcome(&self) -> Option<&PlacementOutcome> {
        self.outcome.as_ref()
    }

    /// Places one chunk of blocks, or finishes if there are none left or cancellation
    /// was requested.
    ///
    /// After the placement has finished, further calls do nothing and return the same
    /// outcome again.
    pub fn step<W: ?Sized + WorldSurface>(&mut self, world: &mut W) -> PlacementStep {
        if let Some(outcome) = &self.outcome {
            return PlacementStep::Finished(outcome.clone());
        }
        if self.cancel.is_cancelled() && self.applied < self.total {
            return self.finish(PlacementOutcome::Cancelled {
                applied: self.applied,
                remaining: self.remaining(),
            });
        }

        let start = self.applied;
        let chunk_len = self.chunk_size.get().min(self.total - start);
        self.chunk_buffer.clear();
        self.chunk_buffer.extend(self.blocks.by_ref().take(chunk_len));

        let result = apply_chunk(
            world,
            &self.chunk_buffer,
            self.assignment.range(start..start + chunk_len),
        );
        match result {
            Ok(()) => {
                self.applied += chunk_len;
                log::debug!("placed {} of {} blocks", self.applied, self.total);
                if self.applied == self.total {
                    self.finish(PlacementOutcome::Done {
                        applied: self.applied,
                    })
                } else {
                    PlacementStep::Continue {
                        applied: self.applied,
                        remaining: self.remaining(),
                    }
                }
            }
            Err((written, cause)) => {
                self.applied += written;
                self.finish(PlacementOutcome::Failed(PlacementPartialFailure {
                    applied: self.applied,
                    remaining: self.remaining(),
                    cause,
                }))
            }
        }
    }

    /// Places all remaining chunks, yielding to `executor` between each one.
    pub async fn run<W: ?Sized + WorldSurface>(
        &mut self,
        world: &mut W,
        executor: &dyn Executor,
    ) -> PlacementOutcome {
        loop {
            match self.step(world) {
                PlacementStep::Finished(outcome) => return outcome,
                PlacementStep::Continue { .. } => executor.yield_now().await,
            }
        }
    }

    fn finish(&mut self, outcome: PlacementOutcome) -> PlacementStep {
        match &outcome {
            PlacementOutcome::Done { applied } => log::debug!("placement done: {applied} blocks"),
            PlacementOutcome::Cancelled { applied, remaining } => {
                log::debug!("placement cancelled: {applied} placed, {remaining} not placed");
            }
            PlacementOutcome::Failed(failure) => log::warn!("{}", ErrorChain(failure)),
        }
        self.outcome = Some(outcome.clone());
        PlacementStep::Finished(outcome)
    }
}

/// Checks then writes one chunk. On a write failure, returns how many were written.
fn apply_chunk<'a, W: ?Sized + WorldSurface>(
    world: &mut W,
    chunk: &[Cube],
    materials: impl Iterator<Item = &'a Material>,
) -> Result<(), (usize, SurfaceError)> {
    for &cube in chunk {
        world.get(cube).map_err(|e| (0, e))?;
    }
    for (written, (&cube, material)) in chunk.iter().zip(materials).enumerate() {
        world.set(cube, material).map_err(|e| (written, e))?;
    }
    Ok(())
}

/// Result of one [`Placement::step()`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum PlacementStep {
    /// A chunk was placed and more remain.
    Continue {
        /// Blocks placed so far.
        applied: usize,
        /// Blocks not yet placed.
        remaining: usize,
    },
    /// The placement has finished, in this step or an earlier one.
    Finished(PlacementOutcome),
}

/// How a placement ended.
#[derive(Clone, Debug, Eq, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum PlacementOutcome {
    /// Every block was placed.
    Done {
        /// Number of blocks placed.
        applied: usize,
    },
    /// Cancellation was requested; the blocks already placed were kept.
    Cancelled {
        /// Number of blocks placed before stopping.
        applied: usize,
        /// Number of blocks not placed.
        remaining: usize,
    },
    /// The world refused an access. Blocks already placed were kept.
    Failed(PlacementPartialFailure),
}

/// Error when a placement stops because the world refused an access.
///
/// No rollback is performed, and the charge for the fill is not refunded.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("placement stopped after {applied} blocks with {remaining} remaining")]
#[non_exhaustive]
pub struct PlacementPartialFailure {
    /// Number of blocks placed before the failure.
    pub applied: usize,
    /// Number of blocks not placed.
    pub remaining: usize,
    /// The error from the world.
    #[source]
    pub cause: SurfaceError,
}

// -------------------------------------------------------------------------------------------------

/// The placement of a confirmed [`FillTask`], obtained from
/// [`FillTask::start_place_blocks()`].
///
/// When the placement finishes, the task's status is updated to match.
/// Dropping the job before it finishes counts as cancelling the placement: the task
/// becomes [`FillStatus::Cancelled`](crate::FillStatus::Cancelled), and blocks already
/// placed are kept.
#[derive(Debug)]
#[must_use = "the fill is not placed until the job is run"]
pub struct PlacementJob {
    placement: Placement<GridIter>,
    task: FillTask,
}

impl PlacementJob {
    pub(crate) fn new(placement: Placement<GridIter>, task: FillTask) -> Self {
        Self { placement, task }
    }

    /// The task this job is placing.
    pub fn task(&self) -> &FillTask {
        &self.task
    }

    /// See [`Placement::applied()`].
    pub fn applied(&self) -> usize {
        self.placement.applied()
    }

    /// See [`Placement::remaining()`].
    pub fn remaining(&self) -> usize {
        self.placement.remaining()
    }

    /// See [`Placement::chunk_count()`].
    pub fn chunk_count(&self) -> usize {
        self.placement.chunk_count()
    }

    /// Places one chunk; see [`Placement::step()`].
    ///
    /// This is for hosts which drive placement from their own update loop, calling it once
    /// per tick.
    pub fn step<W: ?Sized + WorldSurface>(&mut self, world: &mut W) -> PlacementStep {
        let step = self.placement.step(world);
        if let PlacementStep::Finished(outcome) = &step {
            self.task.finish_placement(outcome);
        }
        step
    }

    /// Places all remaining chunks, yielding to `executor` between each one.
    pub async fn run<W: ?Sized + WorldSurface>(
        &mut self,
        world: &mut W,
        executor: &dyn Executor,
    ) -> PlacementOutcome {
        let outcome = self.placement.run(world, executor).await;
        self.task.finish_placement(&outcome);
        outcome
    }
}

impl Drop for PlacementJob {
    fn drop(&mut self) {
        if self.placement.outcome().is_some() {
            return;
        }
        let outcome = PlacementOutcome::Cancelled {
            applied: self.placement.applied(),
            remaining: self.placement.remaining(),
        };
        log::debug!("placement job dropped unfinished: {outcome:?}");
        self.task.finish_placement(&outcome);
    }
}
