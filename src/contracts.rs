//! The catalog of entry points and the argument-list contract of each.
//!
//! A contract describes the shape of a *call*, never of a result. Contracts
//! with more than one call form try the forms in declared order and the first
//! full match wins, so the prepared-statement form of `execute` is always
//! preferred over the connectable form.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// used for the two-way lookup between entry point names and entry points
use bimap::BiMap;
use lazy_static::lazy_static;
use serde::{Serialize, Serializer};

use crate::error::{ContractViolation, Path, SqlshapeError};
use crate::schemas::{
    batch_opts, column_names, connectable, connection, db_spec_or_jdbc, hash_maps, key_map,
    nilable_sql_params, opts_map, param_groups, params, prepared_statement, rows,
    rows_match_columns, sql_params, statement, table, transaction_binding, transaction_body,
    where_params, where_params_or_all,
};
use crate::predicate::Predicate;
use crate::shape::{cat, consistent, or, pred, Conformed, Part, Shape};
use crate::value::Value;
use crate::OtherHasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryPoint {
    GetDatasource,
    GetConnection,
    Prepare,
    Plan,
    Execute,
    ExecuteOne,
    ExecuteBatch,
    Transact,
    WithOptions,
    WithTransaction,
    Insert,
    InsertMulti,
    Query,
    FindByKeys,
    GetById,
    Update,
    Delete,
    ToPool,
    Component,
    SetParameters,
    Statement,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 21] = [
        EntryPoint::GetDatasource,
        EntryPoint::GetConnection,
        EntryPoint::Prepare,
        EntryPoint::Plan,
        EntryPoint::Execute,
        EntryPoint::ExecuteOne,
        EntryPoint::ExecuteBatch,
        EntryPoint::Transact,
        EntryPoint::WithOptions,
        EntryPoint::WithTransaction,
        EntryPoint::Insert,
        EntryPoint::InsertMulti,
        EntryPoint::Query,
        EntryPoint::FindByKeys,
        EntryPoint::GetById,
        EntryPoint::Update,
        EntryPoint::Delete,
        EntryPoint::ToPool,
        EntryPoint::Component,
        EntryPoint::SetParameters,
        EntryPoint::Statement,
    ];

    pub fn name(&self) -> &'static str {
        CATALOG.get_by_right(self).copied().unwrap_or("unknown")
    }
    pub fn from_name(name: &str) -> Option<EntryPoint> {
        CATALOG.get_by_left(name).copied()
    }
    pub fn contract(&self) -> Arc<Contract> {
        // every entry point has a contract, see build_contracts
        Arc::clone(&CONTRACTS[self])
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EntryPoint {
    type Err = SqlshapeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryPoint::from_name(s).ok_or_else(|| SqlshapeError::UnknownEntryPoint(s.to_owned()))
    }
}

impl Serialize for EntryPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ------------- Contract -------------
pub struct Contract {
    entry_point: EntryPoint,
    // a Cat, a Consistent Cat, or an Or of those when there are several call forms
    shape: Shape,
}

impl Contract {
    fn new(entry_point: EntryPoint, shape: Shape) -> Self {
        Self { entry_point, shape }
    }
    pub fn entry_point(&self) -> EntryPoint {
        self.entry_point
    }
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
    /// Labels of the call forms, in the order they are tried.
    pub fn forms(&self) -> Vec<&'static str> {
        match &self.shape {
            Shape::Or(alternatives) => alternatives.iter().map(|(label, _)| *label).collect(),
            _ => Vec::new(),
        }
    }
    pub fn check<'v>(&self, args: &'v [Value]) -> Result<Conformed<'v>, ContractViolation> {
        self.shape
            .conform_seq(args, &Path::root())
            .map_err(|error| ContractViolation {
                entry_point: self.entry_point,
                arity: args.len(),
                error,
            })
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Contract({}: {})", self.entry_point, self.shape.describe())
    }
}

lazy_static! {
    static ref CATALOG: BiMap<&'static str, EntryPoint> = {
        let mut catalog = BiMap::new();
        for entry_point in EntryPoint::ALL {
            catalog.insert(catalog_name(entry_point), entry_point);
        }
        catalog
    };
    static ref CONTRACTS: HashMap<EntryPoint, Arc<Contract>, OtherHasher> = build_contracts();
}

fn catalog_name(entry_point: EntryPoint) -> &'static str {
    match entry_point {
        EntryPoint::GetDatasource => "get_datasource",
        EntryPoint::GetConnection => "get_connection",
        EntryPoint::Prepare => "prepare",
        EntryPoint::Plan => "plan",
        EntryPoint::Execute => "execute",
        EntryPoint::ExecuteOne => "execute_one",
        EntryPoint::ExecuteBatch => "execute_batch",
        EntryPoint::Transact => "transact",
        EntryPoint::WithOptions => "with_options",
        EntryPoint::WithTransaction => "with_transaction",
        EntryPoint::Insert => "insert",
        EntryPoint::InsertMulti => "insert_multi",
        EntryPoint::Query => "query",
        EntryPoint::FindByKeys => "find_by_keys",
        EntryPoint::GetById => "get_by_id",
        EntryPoint::Update => "update",
        EntryPoint::Delete => "delete",
        EntryPoint::ToPool => "to_pool",
        EntryPoint::Component => "component",
        EntryPoint::SetParameters => "set_parameters",
        EntryPoint::Statement => "statement",
    }
}

// plan, execute and execute_one share their call forms
fn statement_or_sql() -> Shape {
    or(vec![
        ("prepared", cat(vec![Part::req("stmt", statement())])),
        (
            "sql",
            cat(vec![
                Part::req("connectable", connectable()),
                Part::req("sql-params", nilable_sql_params()),
                Part::opt("opts", opts_map()),
            ]),
        ),
    ])
}

fn arguments(entry_point: EntryPoint) -> Shape {
    match entry_point {
        EntryPoint::GetDatasource => cat(vec![Part::req("spec", connectable())]),
        EntryPoint::GetConnection => cat(vec![
            Part::req("spec", connectable()),
            Part::opt("opts", opts_map()),
        ]),
        EntryPoint::Prepare => cat(vec![
            Part::req("connection", connection()),
            Part::req("sql-params", sql_params()),
            Part::opt("opts", opts_map()),
        ]),
        EntryPoint::Plan | EntryPoint::Execute | EntryPoint::ExecuteOne => statement_or_sql(),
        // batch options are optional with a prepared statement but required with SQL text
        EntryPoint::ExecuteBatch => or(vec![
            (
                "prepared",
                cat(vec![
                    Part::req("ps", prepared_statement()),
                    Part::req("param-groups", param_groups()),
                    Part::opt("opts", batch_opts()),
                ]),
            ),
            (
                "sql",
                cat(vec![
                    Part::req("connectable", connectable()),
                    Part::req("sql", pred(Predicate::Str)),
                    Part::req("param-groups", param_groups()),
                    Part::req("opts", batch_opts()),
                ]),
            ),
        ]),
        EntryPoint::Transact => cat(vec![
            Part::req("transactable", Shape::Any),
            Part::req("f", transaction_body()),
            Part::opt("opts", opts_map()),
        ]),
        EntryPoint::WithOptions => cat(vec![
            Part::req("connectable", connectable()),
            Part::req("opts", opts_map()),
        ]),
        EntryPoint::WithTransaction => cat(vec![
            Part::req("binding", transaction_binding()),
            Part::req("body", transaction_body()),
        ]),
        EntryPoint::Insert => cat(vec![
            Part::req("connectable", connectable()),
            Part::req("table", table()),
            Part::req("key-map", key_map()),
            Part::opt("opts", opts_map()),
        ]),
        EntryPoint::InsertMulti => or(vec![
            (
                "with-rows-and-columns",
                consistent(
                    cat(vec![
                        Part::req("connectable", connectable()),
                        Part::req("table", table()),
                        Part::req("cols", column_names()),
                        Part::req("rows", rows()),
                        Part::opt("opts", opts_map()),
                    ]),
                    rows_match_columns(),
                ),
            ),
            (
                "with-hash-maps",
                cat(vec![
                    Part::req("connectable", connectable()),
                    Part::req("table", table()),
                    Part::req("hash-maps", hash_maps()),
                    Part::opt("opts", opts_map()),
                ]),
            ),
        ]),
        EntryPoint::Query => cat(vec![
            Part::req("connectable", connectable()),
            Part::req("sql-params", sql_params()),
            Part::opt("opts", opts_map()),
        ]),
        EntryPoint::FindByKeys => cat(vec![
            Part::req("connectable", connectable()),
            Part::req("table", table()),
            Part::req("key-map", where_params_or_all()),
            Part::opt("opts", opts_map()),
        ]),
        // naming the primary key makes the options mandatory
        EntryPoint::GetById => or(vec![
            (
                "with-id",
                cat(vec![
                    Part::req("connectable", connectable()),
                    Part::req("table", table()),
                    Part::req("pk", Shape::Any),
                    Part::opt("opts", opts_map()),
                ]),
            ),
            (
                "pk-name",
                cat(vec![
                    Part::req("connectable", connectable()),
                    Part::req("table", table()),
                    Part::req("pk", Shape::Any),
                    Part::req("pk-name", pred(Predicate::Keyword)),
                    Part::req("opts", opts_map()),
                ]),
            ),
        ]),
        EntryPoint::Update => cat(vec![
            Part::req("connectable", connectable()),
            Part::req("table", table()),
            Part::req("key-map", key_map()),
            Part::req("where-params", where_params()),
            Part::opt("opts", opts_map()),
        ]),
        EntryPoint::Delete => cat(vec![
            Part::req("connectable", connectable()),
            Part::req("table", table()),
            Part::req("where-params", where_params()),
            Part::opt("opts", opts_map()),
        ]),
        EntryPoint::ToPool => cat(vec![
            Part::req("clazz", pred(Predicate::Class)),
            Part::req("db-spec", db_spec_or_jdbc()),
        ]),
        EntryPoint::Component => cat(vec![
            Part::req("clazz", pred(Predicate::Class)),
            Part::req("db-spec", db_spec_or_jdbc()),
            Part::opt("close-fn", pred(Predicate::Callable)),
        ]),
        EntryPoint::SetParameters => cat(vec![
            Part::req("ps", prepared_statement()),
            Part::req("parameters", params()),
        ]),
        EntryPoint::Statement => cat(vec![
            Part::req("connection", connection()),
            Part::opt("opts", opts_map()),
        ]),
    }
}

fn build_contracts() -> HashMap<EntryPoint, Arc<Contract>, OtherHasher> {
    EntryPoint::ALL
        .iter()
        .map(|entry_point| {
            let contract = Contract::new(*entry_point, arguments(*entry_point));
            (*entry_point, Arc::new(contract))
        })
        .collect()
}
