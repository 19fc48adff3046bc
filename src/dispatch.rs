use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::contracts::EntryPoint;
use crate::error::{Result, SqlshapeError};
use crate::registry::ValidationRegistry;
use crate::value::Value;
use crate::OtherHasher;

pub type Operation<R> = Box<dyn Fn(&[Value]) -> R + Send + Sync>;

/// Routes calls to the operation registered for an entry point, checking the
/// arguments first whenever the registry is instrumented.
pub struct Dispatcher<R> {
    registry: Arc<ValidationRegistry>,
    operations: HashMap<EntryPoint, Operation<R>, OtherHasher>,
}

impl<R> Dispatcher<R> {
    pub fn new(registry: Arc<ValidationRegistry>) -> Self {
        Self {
            registry,
            operations: HashMap::default(),
        }
    }
    pub fn registry(&self) -> &Arc<ValidationRegistry> {
        &self.registry
    }
    /// Registers the operation behind an entry point, replacing any earlier one.
    pub fn register<F>(&mut self, entry_point: EntryPoint, operation: F)
    where
        F: Fn(&[Value]) -> R + Send + Sync + 'static,
    {
        self.operations.insert(entry_point, Box::new(operation));
    }
    pub fn call(&self, entry_point: EntryPoint, args: &[Value]) -> Result<R> {
        let operation = self
            .operations
            .get(&entry_point)
            .ok_or(SqlshapeError::NotRegistered(entry_point))?;
        if let Some(conformed) = self.registry.check(entry_point, args)? {
            trace!(entry_point = %entry_point, form = conformed.label().unwrap_or("-"), "arguments conform");
        }
        Ok(operation(args))
    }
}
