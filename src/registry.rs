//! Toggleable enforcement of the entry-point contracts.
//!
//! A [`ValidationRegistry`] is either inactive, in which case every call goes
//! through unchecked, or active, in which case every entry point in the
//! catalog has its contract attached. Instrumenting and unstrumenting swap the
//! whole table under a single lock, so a call never observes a catalog that
//! is only partly instrumented.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// used to record when the registry was last activated
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use tracing::{debug, info, warn};

use crate::contracts::{Contract, EntryPoint};
use crate::error::ContractViolation;
use crate::settings::Settings;
use crate::shape::Conformed;
use crate::value::Value;
use crate::OtherHasher;

#[derive(Default)]
struct Instrumentation {
    checked: HashMap<EntryPoint, Arc<Contract>, OtherHasher>,
    activated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ValidationRegistry {
    state: RwLock<Instrumentation>,
}

impl ValidationRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    /// A registry that is already instrumented when the settings ask for it.
    pub fn from_settings(settings: &Settings) -> Self {
        let registry = Self::new();
        if settings.instrument {
            registry.instrument();
        }
        registry
    }

    // The guarded state is only ever replaced wholesale, so a poisoned lock
    // still holds a consistent table.
    fn read(&self) -> RwLockReadGuard<'_, Instrumentation> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
    fn write(&self) -> RwLockWriteGuard<'_, Instrumentation> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches the contract of every entry point in the catalog. Does nothing
    /// when already active.
    pub fn instrument(&self) {
        let mut state = self.write();
        if !state.checked.is_empty() {
            debug!("already instrumented");
            return;
        }
        let checked = EntryPoint::ALL
            .iter()
            .map(|entry_point| (*entry_point, entry_point.contract()))
            .collect();
        *state = Instrumentation {
            checked,
            activated_at: Some(Utc::now()),
        };
        info!(entry_points = EntryPoint::ALL.len(), "instrumented");
    }

    /// Detaches every contract. Does nothing when already inactive.
    pub fn unstrument(&self) {
        let mut state = self.write();
        if state.checked.is_empty() {
            debug!("already unstrumented");
            return;
        }
        let entry_points = state.checked.len();
        *state = Instrumentation::default();
        info!(entry_points, "unstrumented");
    }

    pub fn is_active(&self) -> bool {
        !self.read().checked.is_empty()
    }
    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.read().activated_at
    }
    /// Entry points currently checked, in catalog order.
    pub fn instrumented(&self) -> Vec<EntryPoint> {
        let mut entry_points: Vec<EntryPoint> = self.read().checked.keys().copied().collect();
        entry_points.sort();
        entry_points
    }

    /// Checks the arguments of a call against its contract when instrumented.
    /// Returns `None` when nothing was checked.
    pub fn check<'v>(
        &self,
        entry_point: EntryPoint,
        args: &'v [Value],
    ) -> Result<Option<Conformed<'v>>, ContractViolation> {
        let contract = match self.read().checked.get(&entry_point) {
            Some(contract) => Arc::clone(contract),
            None => return Ok(None),
        };
        match contract.check(args) {
            Ok(conformed) => Ok(Some(conformed)),
            Err(violation) => {
                warn!(entry_point = %entry_point, arity = args.len(), error = %violation.error, "call rejected");
                Err(violation)
            }
        }
    }
}

lazy_static! {
    static ref GLOBAL: Arc<ValidationRegistry> = Arc::new(ValidationRegistry::new());
}

/// The process-wide registry behind [`crate::instrument`] and [`crate::unstrument`].
pub fn global() -> Arc<ValidationRegistry> {
    Arc::clone(&GLOBAL)
}
