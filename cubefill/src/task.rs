//! [`FillTask`], the state machine for a single fill request.

use core::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::{RngCore as _, SeedableRng as _};
use rand_xoshiro::SplitMix64;

use crate::math::GridIter;
use crate::util::{Executor, ignore_poison, spawn_background};
use crate::{
    Assignment, CancelFlag, Charge, Checkpoint, Cuboid, Distribution, EmptyDistributionError,
    FillError, InsufficientResourceError, MaterialPercent, Placement, PlacementJob,
    PlacementOutcome, Price, PriceCatalog, PriceMultiplier, Quote, ResourceKinds, ResourceLedger,
    UserId,
};


// -------------------------------------------------------------------------------------------------

/// The stages of a [`FillTask`]'s life.
///
/// ```text
/// Idle → CalculatingPrice → WaitingResponsePrice → PlacingBlocks → Done
///                 ↓                  ↓                   ↓
///               Failed           Cancelled          Failed, Cancelled
/// ```
///
/// Any non-terminal state may also become `Cancelled`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum FillStatus {
    /// Created, and not yet priced.
    Idle,
    /// The price is being computed in the background.
    CalculatingPrice,
    /// The price is known, and the user has not yet both confirmed and been charged.
    WaitingResponsePrice,
    /// Blocks are being placed.
    PlacingBlocks,
    /// Every block was placed.
    Done,
    /// Pricing or placement failed.
    Failed,
    /// The user rejected or cancelled the fill, or lacked the resources for it.
    Cancelled,
}

impl FillStatus {
    /// Returns whether this status is final; a task in such a state will never change again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// A request to fill a region with a mixture of materials, from pricing to placement.
///
/// A `FillTask` is a shared handle: clones refer to the same task, so that, for example,
/// one clone may be held by a [`TaskRegistry`](crate::TaskRegistry) while another is
/// used to cancel the task.
///
/// Operations must be performed in order:
///
/// 1. [`calculate_price()`](Self::calculate_price)
/// 2. [`confirm()`](Self::confirm), which must report that the resources are available
/// 3. [`start_place_blocks()`](Self::start_place_blocks)
///
/// Calling one out of order fails with [`InvalidTaskStateError`] and changes nothing.
#[derive(Clone)]
pub struct FillTask {
    shared: Arc<Shared>,
}

struct Shared {
    region: Cuboid,
    material_percents: Arc<[MaterialPercent]>,
    seed: u64,
    cancel: CancelFlag,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    status: FillStatus,
    /// Set by a successful [`FillTask::confirm()`]; only meaningful in `WaitingResponsePrice`.
    confirmed: bool,
    /// Applied to the quote's total; may only change while `Idle`.
    multiplier: PriceMultiplier,
    /// Present in every state after `CalculatingPrice` succeeds.
    priced: Option<Priced>,
}

/// Everything computed from the task's inputs, once, during pricing.
#[derive(Clone, Debug)]
struct Priced {
    materials: Arc<Distribution>,
    assignment: Arc<Assignment>,
    quote: Arc<Quote>,
}

impl FillTask {
    /// Constructs a task to fill `region` with `material_percents`.
    ///
    /// The arrangement of materials is chosen pseudorandomly, but deterministically from
    /// the region and materials, and identically on every platform.
    /// Use [`FillTask::with_seed()`] to control it.
    pub fn new(region: Cuboid, material_percents: impl Into<Arc<[MaterialPercent]>>) -> Self {
        let material_percents = material_percents.into();
        let seed = derive_seed(region, &material_percents);
        Self::with_seed(region, material_percents, seed)
    }

    /// Constructs a task to fill `region` with `material_percents`, arranged according to
    /// `seed`.
    pub fn with_seed(
        region: Cuboid,
        material_percents: impl Into<Arc<[MaterialPercent]>>,
        seed: u64,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                region,
                material_percents: material_percents.into(),
                seed,
                cancel: CancelFlag::new(),
                state: Mutex::new(State {
                    status: FillStatus::Idle,
                    confirmed: false,
                    multiplier: PriceMultiplier::ONE,
                    priced: None,
                }),
            }),
        }
    }

    /// The region this task fills.
    pub fn region(&self) -> Cuboid {
        self.shared.region
    }

    /// The cubes this task fills, in placement order.
    pub fn blocks(&self) -> GridIter {
        self.shared.region.blocks()
    }

    /// The requested materials and their shares.
    pub fn material_percents(&self) -> &[MaterialPercent] {
        &self.shared.material_percents
    }

    /// The seed which determines the arrangement of materials.
    pub fn seed(&self) -> u64 {
        self.shared.seed
    }

    /// Sets the factor by which the quoted total is scaled. The default is
    /// [`PriceMultiplier::ONE`].
    ///
    /// The task must be [`Idle`](FillStatus::Idle).
    pub fn set_price_multiplier(
        &self,
        multiplier: PriceMultiplier,
    ) -> Result<(), InvalidTaskStateError> {
        let mut state = self.lock();
        if state.status != FillStatus::Idle {
            return Err(InvalidTaskStateError::new("set the price multiplier", &state));
        }
        state.multiplier = multiplier;
        Ok(())
    }

    /// The factor by which the quoted total is scaled.
    pub fn price_multiplier(&self) -> PriceMultiplier {
        self.lock().multiplier
    }

    /// Returns the current status.
    pub fn status(&self) -> FillStatus {
        self.lock().status
    }

    /// Returns whether [`confirm()`](Self::confirm) has succeeded.
    pub fn is_confirmed(&self) -> bool {
        self.lock().confirmed
    }

    /// Returns the number of blocks of each material, once the task has been priced.
    pub fn materials(&self) -> Option<Arc<Distribution>> {
        Some(self.lock().priced.as_ref()?.materials.clone())
    }

    /// Returns the quote, once the task has been priced.
    pub fn quote(&self) -> Option<Arc<Quote>> {
        Some(self.lock().priced.as_ref()?.quote.clone())
    }

    /// Returns the total price, once the task has been priced.
    pub fn total_price(&self) -> Option<Price> {
        Some(self.lock().priced.as_ref()?.quote.total())
    }

    /// Returns the charge for this task restricted to `kinds`, once the task has been priced.
    pub fn charge(&self, kinds: ResourceKinds) -> Option<Charge> {
        self.lock().priced.as_ref().map(|priced| priced.charge(kinds))
    }

    /// Returns whether `self` and `other` are handles to the same task.
    pub fn same_task(&self, other: &FillTask) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Computes the distribution of materials and its price, using the executor's
    /// background facility so that the caller's context is not occupied.
    ///
    /// The task must be [`Idle`](FillStatus::Idle). On success it becomes
    /// [`WaitingResponsePrice`](FillStatus::WaitingResponsePrice); if the materials cannot
    /// be distributed, or the background work is lost, it becomes
    /// [`Failed`](FillStatus::Failed). If the task is cancelled meanwhile, this returns
    /// [`FillError::Cancelled`].
    pub async fn calculate_price(
        &self,
        catalog: Arc<PriceCatalog>,
        executor: &dyn Executor,
    ) -> Result<Arc<Quote>, FillError> {
        let multiplier = {
            let mut state = self.lock();
            if state.status != FillStatus::Idle {
                return Err(InvalidTaskStateError::new("calculate the price", &state).into());
            }
            self.set_status(&mut state, FillStatus::CalculatingPrice);
            state.multiplier
        };

        let region = self.shared.region;
        let percents = self.shared.material_percents.clone();
        let seed = self.shared.seed;
        let result = spawn_background(executor, move || {
            let materials = Distribution::compute(&percents, region.volume())?;
            let quote = catalog.quote_scaled(&materials, multiplier);
            let assignment = materials.assign(seed);
            Ok::<_, EmptyDistributionError>(Priced {
                materials: Arc::new(materials),
                assignment: Arc::new(assignment),
                quote: Arc::new(quote),
            })
        })
        .await;

        let mut state = self.lock();
        if state.status != FillStatus::CalculatingPrice {
            return Err(FillError::Cancelled);
        }
        match result {
            Ok(Ok(priced)) => {
                let quote = priced.quote.clone();
                state.priced = Some(priced);
                self.set_status(&mut state, FillStatus::WaitingResponsePrice);
                Ok(quote)
            }
            Ok(Err(error)) => {
                self.set_status(&mut state, FillStatus::Failed);
                Err(error.into())
            }
            Err(error) => {
                self.set_status(&mut state, FillStatus::Failed);
                Err(error.into())
            }
        }
    }

    /// Checks whether `account` has the `kinds` of resources this fill requires, as the
    /// user's confirmation of the quote.
    ///
    /// The task must be [`WaitingResponsePrice`](FillStatus::WaitingResponsePrice) and not
    /// already confirmed. Returns `true` if the resources are available, after which
    /// [`start_place_blocks()`](Self::start_place_blocks) may be called; returns `false`,
    /// and cancels the task, if they are not.
    pub async fn confirm(
        &self,
        ledger: &dyn ResourceLedger,
        account: UserId,
        kinds: ResourceKinds,
    ) -> Result<bool, InvalidTaskStateError> {
        let charge = {
            let state = self.lock();
            match (&state.priced, state.status, state.confirmed) {
                (Some(priced), FillStatus::WaitingResponsePrice, false) => priced.charge(kinds),
                _ => return Err(InvalidTaskStateError::new("confirm", &state)),
            }
        };

        let sufficient = ledger.has(account, &charge).await;

        let mut state = self.lock();
        if state.status != FillStatus::WaitingResponsePrice || state.confirmed {
            // Cancelled, or confirmed by someone else, while we were waiting.
            return Err(InvalidTaskStateError::new("confirm", &state));
        }
        if sufficient {
            state.confirmed = true;
            log::debug!("fill task {:p}: confirmed", Arc::as_ptr(&self.shared));
        } else {
            self.shared.cancel.cancel();
            self.set_status(&mut state, FillStatus::Cancelled);
        }
        Ok(sufficient)
    }

    /// Charges `account` for the `kinds` of resources and begins placing blocks.
    ///
    /// The task must have been [confirmed](Self::confirm). The debit is a single atomic
    /// operation of the ledger; if it fails, nothing is charged, the task is cancelled, and
    /// this returns [`FillError::InsufficientResource`].
    ///
    /// On success, the task becomes [`PlacingBlocks`](FillStatus::PlacingBlocks) and the
    /// returned job must be run to place the blocks.
    pub fn start_place_blocks(
        &self,
        ledger: &dyn ResourceLedger,
        account: UserId,
        kinds: ResourceKinds,
        chunk_size: NonZeroUsize,
    ) -> Result<PlacementJob, FillError> {
        let mut state = self.lock();
        let priced = match (&state.priced, state.status, state.confirmed) {
            (Some(priced), FillStatus::WaitingResponsePrice, true) => priced.clone(),
            _ => return Err(InvalidTaskStateError::new("start placing blocks", &state).into()),
        };

        if let Err(error) = ledger.debit(account, &priced.charge(kinds)) {
            self.shared.cancel.cancel();
            self.set_status(&mut state, FillStatus::Cancelled);
            return Err(InsufficientResourceError::new(Checkpoint::Start, error.lacking).into());
        }
        self.set_status(&mut state, FillStatus::PlacingBlocks);
        drop(state);

        let placement = Placement::new(
            self.blocks(),
            priced.assignment,
            chunk_size,
            self.shared.cancel.clone(),
        );
        Ok(PlacementJob::new(placement, self.clone()))
    }

    /// Cancels the task.
    ///
    /// If blocks are being placed, placement stops after the chunk in progress, and the
    /// task becomes [`Cancelled`](FillStatus::Cancelled) when its [`PlacementJob`] next
    /// runs. Otherwise, the task becomes `Cancelled` immediately.
    ///
    /// Returns `false` if the task had already finished.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock();
        if state.status.is_terminal() {
            return false;
        }
        self.shared.cancel.cancel();
        if state.status != FillStatus::PlacingBlocks {
            self.set_status(&mut state, FillStatus::Cancelled);
        }
        true
    }

    /// Records the end of placement.
    pub(crate) fn finish_placement(&self, outcome: &PlacementOutcome) {
        let mut state = self.lock();
        if state.status != FillStatus::PlacingBlocks {
            return;
        }
        let status = match outcome {
            PlacementOutcome::Done { .. } => FillStatus::Done,
            PlacementOutcome::Cancelled { .. } => FillStatus::Cancelled,
            PlacementOutcome::Failed(_) => FillStatus::Failed,
        };
        self.set_status(&mut state, status);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State changes are single assignments, so a panic cannot leave them inconsistent.
        ignore_poison(self.shared.state.lock())
    }

    fn set_status(&self, state: &mut State, status: FillStatus) {
        log::debug!(
            "fill task {:p}: {:?} -> {status:?}",
            Arc::as_ptr(&self.shared),
            state.status
        );
        state.status = status;
    }
}

impl Priced {
    fn charge(&self, kinds: ResourceKinds) -> Charge {
        Charge {
            kinds,
            price: self.quote.total(),
            materials: self.materials.clone(),
        }
    }
}

/// Starting state of [`derive_seed()`]; any constant will do, but it must never change.
const SEED_BASIS: u64 = 0x243F_6A88_85A3_08D3;

/// Computes the default seed of a task from its inputs, using only fixed integer mixing so
/// that a request is arranged the same way on every platform and toolchain.
fn derive_seed(region: Cuboid, material_percents: &[MaterialPercent]) -> u64 {
    let mut state = SEED_BASIS;
    let mut mix = |word: u64| {
        state = SplitMix64::from_seed((state ^ word).to_le_bytes()).next_u64();
    };

    let bounds = region.bounds();
    for point in [bounds.lower_bounds(), bounds.upper_bounds()] {
        for coordinate in point.to_array() {
            mix(u64::from(coordinate.cast_unsigned()));
        }
    }
    mix(material_percents.len() as u64);
    for MaterialPercent { material, percent } in material_percents {
        let bytes = material.as_str().as_bytes();
        mix(bytes.len() as u64);
        for chunk in bytes.chunks(8) {
            let mut word = [0; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            mix(u64::from_le_bytes(word));
        }
        mix(u64::from(percent.hundredths()));
    }
    state
}

impl fmt::Debug for FillTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Shared {
            region,
            material_percents,
            seed: _,
            cancel: _,
            state,
        } = &*self.shared;
        let status = ignore_poison(state.lock()).status;
        f.debug_struct("FillTask")
            .field("region", region)
            .field("material_percents", material_percents)
            .field("status", &status)
            .finish_non_exhaustive()
    }
}

/// Error when a [`FillTask`] operation is called in a state where it is not allowed.
///
/// The task is unchanged.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("cannot {operation} while the task is {status:?}")]
#[non_exhaustive]
pub struct InvalidTaskStateError {
    /// What was attempted.
    pub operation: &'static str,
    /// The task's status at the time.
    pub status: FillStatus,
    /// Whether the task had been confirmed at the time.
    pub confirmed: bool,
}

impl InvalidTaskStateError {
    fn new(operation: &'static str, state: &State) -> Self {
        Self {
            operation,
            status: state.status,
            confirmed: state.confirmed,
        }
    }
}
