//! Named, reusable shapes shared by the entry-point contracts.
//!
//! Each function builds a fresh [`Shape`]; contracts are assembled once and
//! cached (see [`crate::contracts`]) so building here is never on a call path.

use crate::predicate::Predicate;
use crate::shape::{
    and, cat, coll_of, map_of, named, nilable, one_of, or, pred, CollKind, Conformed, Part, Rule, Shape,
};
use crate::value::{Capability, Value};

// ------------- Connection descriptors -------------
pub fn host() -> Shape {
    or(vec![
        ("name", pred(Predicate::Str)),
        ("none", one_of(vec![Value::kw("none")])),
    ])
}

/// `{:dbtype "..." :dbname "..."}` plus the optional connection details.
pub fn db_spec_map() -> Shape {
    named(
        "db-spec-map",
        Shape::Keys {
            req: vec![
                ("dbtype", pred(Predicate::Str)),
                ("dbname", pred(Predicate::Str)),
            ],
            opt: vec![
                ("classname", pred(Predicate::Str)),
                ("user", pred(Predicate::Str)),
                ("password", pred(Predicate::Str)),
                ("host", host()),
                ("port", pred(Predicate::PosInt)),
                ("dbname-separator", pred(Predicate::Str)),
                ("host-prefix", pred(Predicate::Str)),
            ],
        },
    )
}

pub fn jdbc_url() -> Shape {
    named("jdbc-url", and(vec![pred(Predicate::Str), pred(Predicate::JdbcUrl)]))
}

pub fn jdbc_url_map() -> Shape {
    named(
        "jdbc-url-map",
        Shape::Keys {
            req: vec![("jdbcUrl", jdbc_url())],
            opt: vec![],
        },
    )
}

pub fn datasource() -> Shape {
    pred(Predicate::Capable(Capability::DataSource))
}

/// The four mutually exclusive ways of saying what to connect to.
pub fn db_spec() -> Shape {
    named(
        "db-spec",
        or(vec![
            ("db-spec", db_spec_map()),
            ("jdbc-url", jdbc_url_map()),
            ("string", jdbc_url()),
            ("ds", datasource()),
        ]),
    )
}

// what connection pools and components can be built from
pub fn db_spec_or_jdbc() -> Shape {
    named(
        "db-spec-or-jdbc",
        or(vec![
            ("db-spec", db_spec_map()),
            ("jdbc-url", jdbc_url_map()),
        ]),
    )
}

/// Anything that can be turned into a usable connection.
pub fn connectable() -> Shape {
    named(
        "connectable",
        or(vec![
            ("db-spec", db_spec()),
            ("connectable", pred(Predicate::Capable(Capability::Connectable))),
            ("sourceable", pred(Predicate::Capable(Capability::Sourceable))),
        ]),
    )
}

pub fn connection() -> Shape {
    pred(Predicate::Capable(Capability::Connection))
}

pub fn statement() -> Shape {
    pred(Predicate::Capable(Capability::Statement))
}

pub fn prepared_statement() -> Shape {
    pred(Predicate::Capable(Capability::PreparedStatement))
}

pub fn table() -> Shape {
    pred(Predicate::Keyword)
}

// ------------- Options -------------
/// A bare column, or `[expr alias]` where `expr` is a column or a raw SQL string.
pub fn column_spec() -> Shape {
    named(
        "column-spec",
        or(vec![
            ("column", pred(Predicate::Keyword)),
            (
                "alias",
                and(vec![
                    pred(Predicate::Vector),
                    cat(vec![
                        Part::req(
                            "expr",
                            or(vec![
                                ("col", pred(Predicate::Keyword)),
                                ("str", pred(Predicate::Str)),
                            ]),
                        ),
                        Part::req("column", pred(Predicate::Keyword)),
                    ]),
                ]),
            ),
        ]),
    )
}

pub fn columns() -> Shape {
    named("columns", coll_of(column_spec(), CollKind::Vector, 0))
}

pub fn order_by_col() -> Shape {
    named(
        "order-by-col",
        or(vec![
            ("col", pred(Predicate::Keyword)),
            (
                "dir",
                cat(vec![
                    Part::req("col", pred(Predicate::Keyword)),
                    Part::req("dir", one_of(vec![Value::kw("asc"), Value::kw("desc")])),
                ]),
            ),
        ]),
    )
}

pub fn order_by() -> Shape {
    named("order-by", coll_of(order_by_col(), CollKind::Vector, 1))
}

pub fn opts_map() -> Shape {
    named(
        "opts-map",
        and(vec![
            map_of(pred(Predicate::Keyword), Shape::Any, 0),
            Shape::Keys {
                req: vec![],
                opt: vec![("columns", columns()), ("order-by", order_by())],
            },
        ]),
    )
}

pub fn batch_opts() -> Shape {
    named(
        "batch-opts",
        Shape::Keys {
            req: vec![],
            opt: vec![
                ("batch-size", pred(Predicate::PosInt)),
                ("large", pred(Predicate::Bool)),
            ],
        },
    )
}

// ------------- SQL & parameters -------------
/// `["select ... where x = ?" param ...]`
pub fn sql_params() -> Shape {
    named(
        "sql-params",
        and(vec![
            pred(Predicate::Vector),
            cat(vec![
                Part::req("sql", pred(Predicate::Str)),
                Part::many("params", Shape::Any),
            ]),
        ]),
    )
}

pub fn nilable_sql_params() -> Shape {
    nilable(sql_params())
}

pub fn params() -> Shape {
    named("params", coll_of(Shape::Any, CollKind::Sequential, 0))
}

pub fn param_groups() -> Shape {
    named("param-groups", coll_of(params(), CollKind::Sequential, 0))
}

// ------------- Key maps -------------
pub fn key_map() -> Shape {
    named("key-map", map_of(pred(Predicate::Keyword), Shape::Any, 0))
}

// at least one column to match on
pub fn example_map() -> Shape {
    named("example-map", map_of(pred(Predicate::Keyword), Shape::Any, 1))
}

pub fn where_params() -> Shape {
    named(
        "where-params",
        or(vec![("example", example_map()), ("where", sql_params())]),
    )
}

pub fn where_params_or_all() -> Shape {
    named(
        "key-map-or-where",
        or(vec![
            ("example", example_map()),
            ("where", sql_params()),
            ("all", one_of(vec![Value::kw("all")])),
        ]),
    )
}

pub fn hash_maps() -> Shape {
    named("hash-maps", coll_of(pred(Predicate::Map), CollKind::Sequential, 1))
}

pub fn column_names() -> Shape {
    named("cols", coll_of(pred(Predicate::Keyword), CollKind::Sequential, 1))
}

pub fn rows() -> Shape {
    named(
        "rows",
        coll_of(coll_of(Shape::Any, CollKind::Sequential, 0), CollKind::Sequential, 0),
    )
}

/// Every row must have exactly as many values as there are columns.
pub fn rows_match_columns() -> Rule {
    Rule {
        name: "row length equals column count",
        check: rows_match_columns_check,
    }
}

fn rows_match_columns_check(conformed: &Conformed<'_>) -> Option<(Vec<usize>, String)> {
    let columns = conformed.part("cols")?.items()?.len();
    let rows = conformed.part("rows")?.items()?;
    let offending: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.items().map_or(0, |items| items.len()) != columns)
        .map(|(index, _)| index)
        .collect();
    if offending.is_empty() {
        return None;
    }
    let lengths: Vec<String> = offending
        .iter()
        .map(|i| {
            let length = rows[*i].items().map_or(0, |items| items.len());
            format!("row {} has {}", i, length)
        })
        .collect();
    Some((
        offending,
        format!("{} column(s), but {}", columns, lengths.join(", ")),
    ))
}

// ------------- Callables & binding forms -------------
pub fn transaction_body() -> Shape {
    pred(Predicate::CallableWith(&[0, 1]))
}

/// `[name transactable opts?]`
pub fn transaction_binding() -> Shape {
    named(
        "binding",
        and(vec![
            pred(Predicate::Vector),
            cat(vec![
                Part::req("name", pred(Predicate::SimpleSymbol)),
                Part::req("transactable", Shape::Any),
                Part::opt("opts", opts_map()),
            ]),
        ]),
    )
}
