//! Sqlshape – argument contracts for a polymorphic SQL data-access API.
//!
//! A data-access layer accepts many loosely typed argument forms: a
//! connectable may be a db-spec map, a JDBC URL, a datasource or a live
//! connection; SQL travels as `["select ... ?" param ...]`; options are
//! open maps with a couple of well-known keys. Sqlshape declares, for every
//! public entry point of such a layer, which argument lists are acceptable,
//! and checks calls against those declarations while instrumentation is
//! switched on.
//!
//! The moving parts:
//! * [`value::Value`] is the dynamic argument model (keywords, maps, vectors,
//!   callables and opaque [`value::Handle`]s that only answer capability
//!   questions).
//! * [`shape::Shape`] is a small combinator language (conjunction, tagged
//!   alternation, collections, key sets, sequence patterns and cross-field
//!   rules). Conforming either yields a [`shape::Conformed`] view or a
//!   [`error::ShapeError`] that points at the deepest failure.
//! * [`schemas`] holds the reusable named shapes, [`contracts`] the catalog of
//!   [`contracts::EntryPoint`]s and their argument-list contracts.
//! * [`registry::ValidationRegistry`] switches enforcement on and off for the
//!   whole catalog at once, and [`dispatch::Dispatcher`] puts it in front of
//!   the real operations.
//! * [`settings::Settings`] reads the runtime configuration.
//!
//! ## Alternation
//! Contracts with several call forms try them in declared order and the
//! first full match wins. When none match, the report lists every form with
//! its own reason, so a caller can see *why* the SQL-text form of
//! `execute_batch` was rejected (the options are missing) rather than only
//! that nothing matched.
//!
//! ## Quick Start
//! ```
//! use sqlshape::{contracts::EntryPoint, registry::ValidationRegistry, value::Value};
//! let registry = ValidationRegistry::new();
//! let spec = Value::map([("dbtype", Value::str("h2")), ("dbname", Value::str("example"))]);
//! let args = vec![spec, Value::vector([Value::str("select * from fruit")])];
//! // nothing is checked until instrumented
//! assert!(registry.check(EntryPoint::Execute, &args).unwrap().is_none());
//! registry.instrument();
//! let conformed = registry.check(EntryPoint::Execute, &args).unwrap().unwrap();
//! assert_eq!(conformed.label(), Some("sql"));
//! let bad = vec![Value::map([("dbtype", Value::str("h2"))])];
//! assert!(registry.check(EntryPoint::Execute, &bad).is_err());
//! ```
//!
//! ## Configuration & Logging
//! The `sqlshape` binary reads a `sqlshape.toml` (or any format the `config`
//! crate understands) plus `SQLSHAPE_*` environment variables, and logs
//! through `tracing`. The library itself only emits events; installing a
//! subscriber is left to the application.

pub mod error;
pub mod value;
pub mod predicate;
pub mod shape;
pub mod schemas;
pub mod contracts;
pub mod registry;
pub mod dispatch;
pub mod settings;

use std::hash::BuildHasherDefault;

// used for hashmaps keyed on entry points
use seahash::SeaHasher;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub use contracts::EntryPoint;
pub use error::{ContractViolation, Result, ShapeError, SqlshapeError};
pub use registry::{global, ValidationRegistry};
pub use value::Value;

/// Instruments the process-wide registry.
pub fn instrument() {
    registry::global().instrument();
}

/// Unstruments the process-wide registry.
pub fn unstrument() {
    registry::global().unstrument();
}
