//! Test doubles for the host-provided traits.
//!
//! These are not intended for use outside of this crate's tests, and are not stable API.

#![allow(missing_docs)]

use core::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_core::future::BoxFuture;
use hashbrown::HashMap;

use crate::util::{Executor, YieldNow, ignore_poison};
use crate::{
    Charge, DebitError, FillNotice, Material, NotificationSink, Price, ResourceKinds,
    ResourceLedger, UserId,
};

// -------------------------------------------------------------------------------------------------

/// [`Executor`] which runs background work immediately on the calling thread, and counts
/// yields.
#[derive(Clone)]
pub struct InlineExecutor {
    run_background: bool,
    yields: Arc<AtomicUsize>,
    on_yield: Option<Arc<dyn Fn(usize) + Send + Sync>>,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self {
            run_background: true,
            yields: Arc::default(),
            on_yield: None,
        }
    }

    /// Constructs an executor which drops all background work without running it.
    pub fn refusing() -> Self {
        Self {
            run_background: false,
            ..Self::new()
        }
    }

    /// Calls `hook` with the 1-based number of each yield, before the yield happens.
    #[must_use]
    pub fn on_yield(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_yield = Some(Arc::new(hook));
        self
    }

    /// Number of times [`Executor::yield_now()`] has been called.
    pub fn yield_count(&self) -> usize {
        self.yields.load(Ordering::Relaxed)
    }
}

impl Default for InlineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InlineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineExecutor")
            .field("run_background", &self.run_background)
            .field("yields", &self.yield_count())
            .finish_non_exhaustive()
    }
}

impl Executor for InlineExecutor {
    fn spawn_background(&self, work: Box<dyn FnOnce() + Send + 'static>) {
        if self.run_background {
            work();
        }
    }

    fn yield_now(&self) -> BoxFuture<'static, ()> {
        let count = self.yields.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(hook) = &self.on_yield {
            hook(count);
        }
        Box::pin(YieldNow::default())
    }
}

// -------------------------------------------------------------------------------------------------

/// [`ResourceLedger`] which keeps balances and inventories in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<UserId, Account>>,
    debits: AtomicUsize,
}

#[derive(Debug, Default)]
struct Account {
    balance: Price,
    items: HashMap<Material, usize>,
}

impl Account {
    fn lacking(&self, charge: &Charge) -> ResourceKinds {
        let mut lacking = ResourceKinds::empty();
        if charge.kinds.contains(ResourceKinds::CURRENCY) && self.balance < charge.price {
            lacking |= ResourceKinds::CURRENCY;
        }
        if charge.kinds.contains(ResourceKinds::ITEMS)
            && charge
                .materials
                .iter()
                .any(|(material, count)| self.items.get(material).copied().unwrap_or(0) < count)
        {
            lacking |= ResourceKinds::ITEMS;
        }
        lacking
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, account: UserId, balance: Price) {
        ignore_poison(self.accounts.lock())
            .entry(account)
            .or_default()
            .balance = balance;
    }

    pub fn set_items(&self, account: UserId, material: Material, count: usize) {
        ignore_poison(self.accounts.lock())
            .entry(account)
            .or_default()
            .items
            .insert(material, count);
    }

    pub fn balance(&self, account: UserId) -> Price {
        ignore_poison(self.accounts.lock())
            .get(&account)
            .map_or(Price::ZERO, |a| a.balance)
    }

    pub fn items(&self, account: UserId, material: &Material) -> usize {
        ignore_poison(self.accounts.lock())
            .get(&account)
            .and_then(|a| a.items.get(material).copied())
            .unwrap_or(0)
    }

    /// Number of successful debits.
    pub fn debit_count(&self) -> usize {
        self.debits.load(Ordering::Relaxed)
    }
}

impl ResourceLedger for MemoryLedger {
    fn has<'a>(&'a self, account: UserId, charge: &'a Charge) -> BoxFuture<'a, bool> {
        let sufficient = match ignore_poison(self.accounts.lock()).get(&account) {
            Some(a) => a.lacking(charge).is_empty(),
            None => Account::default().lacking(charge).is_empty(),
        };
        Box::pin(core::future::ready(sufficient))
    }

    fn debit(&self, account: UserId, charge: &Charge) -> Result<(), DebitError> {
        let mut accounts = ignore_poison(self.accounts.lock());
        let account = accounts.entry(account).or_default();
        let lacking = account.lacking(charge);
        if !lacking.is_empty() {
            return Err(DebitError::new(lacking));
        }
        if charge.kinds.contains(ResourceKinds::CURRENCY) {
            account.balance = account.balance.checked_sub(charge.price).unwrap_or(Price::ZERO);
        }
        if charge.kinds.contains(ResourceKinds::ITEMS) {
            for (material, count) in charge.materials.iter() {
                if let Some(held) = account.items.get_mut(material) {
                    *held -= count;
                }
            }
        }
        self.debits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// [`NotificationSink`] which records every notice.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<(UserId, FillNotice)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all notices delivered so far, in order.
    pub fn notices(&self) -> Vec<(UserId, FillNotice)> {
        ignore_poison(self.notices.lock()).clone()
    }

    /// Returns the notices delivered to `user` so far, in order.
    pub fn notices_for(&self, user: UserId) -> Vec<FillNotice> {
        ignore_poison(self.notices.lock())
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, notice)| notice.clone())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, user: UserId, notice: FillNotice) {
        ignore_poison(self.notices.lock()).push((user, notice));
    }
}
