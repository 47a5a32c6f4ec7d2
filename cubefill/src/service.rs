//! [`FillService`], which handles users' fill requests from selection to placement.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use arcstr::ArcStr;
use hashbrown::HashMap;

use crate::util::{ErrorChain, Executor, ignore_poison};
use crate::{
    Checkpoint, FillConfig, FillError, FillNotice, FillStatus, FillTask,
    InsufficientResourceError, Material, MaterialPercent, NotificationSink, PlacementJob,
    PlacementOutcome, PriceCatalog, Quote, ResourceKinds, ResourceLedger, Selection,
    TaskRegistry, UserId, WorldSurface, lacking_resources,
};

// -------------------------------------------------------------------------------------------------

/// Handles fill requests on behalf of many users, reporting each outcome to the user
/// through a [`NotificationSink`].
///
/// The service keeps each user's current [`FillTask`] and enforces that there is at most
/// one. A user's request proceeds through:
///
/// 1. [`request_fill()`](Self::request_fill), which validates it and produces a quote;
/// 2. [`confirm()`](Self::confirm) or [`reject()`](Self::reject);
/// 3. [`run_placement()`](Self::run_placement), with the job `confirm()` returned, in the
///    context which owns the world.
///
/// [`cancel()`](Self::cancel) may be used at any point.
///
/// Every request names one of the configured [`FillTool`](crate::FillTool)s, which limits
/// the region, scales the price, and may be used only so many times by each user.
///
/// The service's methods take `&self` and may be called concurrently for different users.
pub struct FillService {
    registry: Mutex<TaskRegistry>,
    usage: Mutex<ToolUsage>,
    catalog: Arc<PriceCatalog>,
    ledger: Arc<dyn ResourceLedger>,
    sink: Arc<dyn NotificationSink>,
    executor: Arc<dyn Executor>,
    config: FillConfig,
}

impl FillService {
    #[allow(missing_docs)]
    pub fn new(
        catalog: Arc<PriceCatalog>,
        ledger: Arc<dyn ResourceLedger>,
        sink: Arc<dyn NotificationSink>,
        executor: Arc<dyn Executor>,
        config: FillConfig,
    ) -> Self {
        Self {
            registry: Mutex::new(TaskRegistry::new()),
            usage: Mutex::default(),
            catalog,
            ledger,
            sink,
            executor,
            config,
        }
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    #[allow(missing_docs)]
    pub fn catalog(&self) -> &Arc<PriceCatalog> {
        &self.catalog
    }

    /// Returns the user's current task, if any.
    pub fn task(&self, user: UserId) -> Option<FillTask> {
        self.registry().task(user).cloned()
    }

    /// Returns whether `material` may be used in a fill.
    pub fn is_allowed(&self, material: &Material) -> bool {
        !self.config.blacklist.contains(material)
    }

    /// Returns the materials with a listed price which are not blacklisted, in order.
    ///
    /// Unlisted materials may be allowed too; this is the list to offer users.
    pub fn allowed_materials(&self) -> Vec<Material> {
        let mut materials: Vec<Material> = self
            .catalog
            .listed_materials()
            .filter(|material| self.is_allowed(material))
            .cloned()
            .collect();
        materials.sort();
        materials
    }

    /// Returns the names of the configured tools, in order.
    pub fn tool_names(&self) -> impl Iterator<Item = &ArcStr> + '_ {
        self.config.tools.keys()
    }

    /// Returns how many fills `user` has placed with the named tool.
    pub fn tool_uses(&self, user: UserId, tool: &str) -> u32 {
        let Some((name, _)) = self.config.tool(tool) else {
            return 0;
        };
        self.usage().uses_of(user, name)
    }

    /// Validates a request to fill the selected region with `material_percents` using the
    /// named tool, makes it the user's current task, and calculates its price.
    ///
    /// On success, the user has been sent [`FillNotice::QuoteReady`] and the task awaits
    /// [`confirm()`](Self::confirm). On failure, the user has been sent a notice saying
    /// why, and any task created has been removed.
    pub async fn request_fill(
        &self,
        user: UserId,
        tool: &str,
        selection: &Selection,
        material_percents: Vec<MaterialPercent>,
    ) -> Result<Arc<Quote>, FillError> {
        let Some((tool_name, tool)) = self.config.tool(tool) else {
            self.notify(user, FillNotice::UnknownTool(tool.into()));
            return Err(FillError::UnknownTool(tool.into()));
        };
        if let Some(max_use) = tool.max_use
            && self.usage().uses_of(user, tool_name) >= max_use
        {
            self.notify(user, FillNotice::ToolUsedUp(tool_name.clone()));
            return Err(FillError::ToolUsedUp {
                tool: tool_name.clone(),
                max_use,
            });
        }

        let region = match selection.cuboid() {
            Ok(region) => region,
            Err(error) => {
                self.notify(user, FillNotice::SelectionIncomplete);
                return Err(error.into());
            }
        };
        if let Some(mp) = material_percents
            .iter()
            .find(|mp| !self.is_allowed(&mp.material))
        {
            self.notify(user, FillNotice::MaterialNotAllowed(mp.material.clone()));
            return Err(FillError::MaterialNotAllowed(mp.material.clone()));
        }
        let (volume, max_extent) = (region.volume(), region.max_extent());
        if !tool.allows(volume, max_extent) {
            self.notify(user, FillNotice::SelectionTooLarge { volume, max_extent });
            return Err(FillError::SelectionTooLarge { volume, max_extent });
        }

        let task = FillTask::new(region, material_percents);
        task.set_price_multiplier(tool.price_multiplier)?;
        let installed = self.registry().try_set_task(user, task.clone());
        if let Err(error) = installed {
            self.notify(user, FillNotice::AlreadyRunning);
            return Err(error.into());
        }
        self.usage().current.insert(user, tool_name.clone());
        log::debug!("{user} requested {task:?} with {tool_name}");

        let quote = match task
            .calculate_price(self.catalog.clone(), &*self.executor)
            .await
        {
            Ok(quote) => quote,
            Err(error) => {
                self.clear(user, &task);
                match error {
                    // Whoever cancelled has already told the user.
                    FillError::Cancelled => {}
                    FillError::EmptyDistribution(_) => self.notify(user, FillNotice::NoMaterials),
                    _ => {
                        log::warn!("pricing for {user} failed: {}", ErrorChain(&error));
                        self.notify(user, FillNotice::PricingFailed);
                    }
                }
                return Err(error);
            }
        };

        self.check_checkpoint(user, &task, Checkpoint::Quote).await?;
        if task.status() != FillStatus::WaitingResponsePrice {
            return Err(FillError::Cancelled);
        }

        self.notify(user, FillNotice::QuoteReady(quote.clone()));
        Ok(quote)
    }

    /// Accepts the user's pending quote: checks their resources, charges them, and
    /// returns the job which places the blocks.
    ///
    /// The job should be passed to [`run_placement()`](Self::run_placement).
    /// If the user has no task awaiting confirmation, or lacks the resources, this fails
    /// and the user is notified.
    pub async fn confirm(&self, user: UserId) -> Result<PlacementJob, FillError> {
        let Some(task) = self.pending_task(user) else {
            self.notify(user, FillNotice::NoPendingTask);
            return Err(FillError::NoPendingTask);
        };
        self.notify(user, FillNotice::CheckingResources);

        let kinds = self.config.policy.at_confirm;
        let sufficient = task.confirm(&*self.ledger, user, kinds).await?;
        if !sufficient {
            // The task has cancelled itself; find out what was missing, for the notice.
            let mut lacking = match task.charge(kinds) {
                Some(charge) => lacking_resources(&*self.ledger, user, &charge).await,
                None => ResourceKinds::empty(),
            };
            if lacking.is_empty() {
                lacking = kinds;
            }
            return Err(self.abandon(user, &task, Checkpoint::Confirm, lacking));
        }

        self.check_checkpoint(user, &task, Checkpoint::Start).await?;

        match task.start_place_blocks(
            &*self.ledger,
            user,
            self.config.policy.debited(),
            self.config.chunk_size,
        ) {
            Ok(job) => {
                self.usage().record_use(user);
                self.notify(
                    user,
                    FillNotice::PlacementStarted {
                        blocks: job.remaining(),
                    },
                );
                Ok(job)
            }
            Err(FillError::InsufficientResource(error)) => {
                Err(self.abandon(user, &task, error.checkpoint, error.lacking))
            }
            Err(error) => {
                self.clear(user, &task);
                Err(error)
            }
        }
    }

    /// Declines the user's pending quote.
    pub fn reject(&self, user: UserId) -> Result<(), FillError> {
        let Some(task) = self.pending_task(user) else {
            self.notify(user, FillNotice::NoPendingTask);
            return Err(FillError::NoPendingTask);
        };
        task.cancel();
        self.clear(user, &task);
        self.notify(user, FillNotice::Cancelled);
        Ok(())
    }

    /// Cancels the user's current task, whatever stage it is in.
    ///
    /// If blocks are being placed, placement stops after the current chunk and
    /// [`run_placement()`](Self::run_placement) reports the cancellation. Returns `false`
    /// if the user had no unfinished task.
    pub fn cancel(&self, user: UserId) -> bool {
        let Some(task) = self.task(user) else {
            return false;
        };
        if !task.cancel() {
            // Finished without being reported, as when its placement job was dropped.
            self.clear(user, &task);
            return false;
        }
        if task.status() == FillStatus::Cancelled {
            self.clear(user, &task);
            self.notify(user, FillNotice::Cancelled);
        }
        true
    }

    /// Places the blocks of a confirmed fill, yielding between chunks, then reports the
    /// outcome to the user and removes the finished task.
    pub async fn run_placement<W: ?Sized + WorldSurface>(
        &self,
        user: UserId,
        mut job: PlacementJob,
        world: &mut W,
    ) -> PlacementOutcome {
        let outcome = job.run(world, &*self.executor).await;
        self.clear(user, job.task());
        let notice = match outcome {
            PlacementOutcome::Done { applied } => {
                log::info!("{user} filled {applied} blocks");
                FillNotice::PlacementDone { applied }
            }
            PlacementOutcome::Cancelled { applied, remaining } => {
                FillNotice::PlacementCancelled { applied, remaining }
            }
            PlacementOutcome::Failed(ref failure) => FillNotice::PlacementFailed {
                applied: failure.applied,
                remaining: failure.remaining,
            },
        };
        self.notify(user, notice);
        outcome
    }

    /// Checks the resources required at `checkpoint`, abandoning the task if they are
    /// lacking.
    async fn check_checkpoint(
        &self,
        user: UserId,
        task: &FillTask,
        checkpoint: Checkpoint,
    ) -> Result<(), FillError> {
        let Some(charge) = task.charge(self.config.policy.at(checkpoint)) else {
            return Ok(());
        };
        if charge.kinds.is_empty() {
            return Ok(());
        }
        let lacking = lacking_resources(&*self.ledger, user, &charge).await;
        if lacking.is_empty() {
            Ok(())
        } else {
            task.cancel();
            Err(self.abandon(user, task, checkpoint, lacking))
        }
    }

    /// Removes a task which failed for lack of resources, notifies the user, and returns
    /// the error to report.
    fn abandon(
        &self,
        user: UserId,
        task: &FillTask,
        checkpoint: Checkpoint,
        lacking: ResourceKinds,
    ) -> FillError {
        log::debug!("{user} lacks {lacking} when {checkpoint}");
        self.clear(user, task);
        for notice in FillNotice::insufficient(lacking) {
            self.notify(user, notice);
        }
        InsufficientResourceError::new(checkpoint, lacking).into()
    }

    /// Returns the user's task if it is awaiting confirmation.
    fn pending_task(&self, user: UserId) -> Option<FillTask> {
        self.task(user).filter(|task| {
            task.status() == FillStatus::WaitingResponsePrice && !task.is_confirmed()
        })
    }

    fn clear(&self, user: UserId, task: &FillTask) {
        self.registry().clear_task_if(user, task);
    }

    fn notify(&self, user: UserId, notice: FillNotice) {
        self.sink.notify(user, notice);
    }

    /// Never hold this guard across an `await`.
    fn registry(&self) -> MutexGuard<'_, TaskRegistry> {
        // Registry updates are single insertions or removals.
        ignore_poison(self.registry.lock())
    }

    fn usage(&self) -> MutexGuard<'_, ToolUsage> {
        ignore_poison(self.usage.lock())
    }
}

/// Which tool each user's latest request was made with, and how many fills each user has
/// placed with each tool.
#[derive(Debug, Default)]
struct ToolUsage {
    current: HashMap<UserId, ArcStr>,
    uses: HashMap<(UserId, ArcStr), u32>,
}

impl ToolUsage {
    fn uses_of(&self, user: UserId, tool: &ArcStr) -> u32 {
        self.uses.get(&(user, tool.clone())).copied().unwrap_or(0)
    }

    fn record_use(&mut self, user: UserId) {
        if let Some(tool) = self.current.remove(&user) {
            let count = self.uses.entry((user, tool)).or_insert(0);
            *count = count.saturating_add(1);
        }
    }
}

impl fmt::Debug for FillService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillService")
            .field("registry", &*self.registry())
            .field("catalog", &self.catalog)
            .field("executor", &self.executor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
