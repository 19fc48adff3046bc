//! Primitive predicates: the atomic checks every composite shape is built from.
//!
//! Every predicate is total. A value of an unexpected kind simply fails the
//! check, it never raises.

// used to validate jdbc urls
use regex::Regex;
use lazy_static::lazy_static;

use crate::value::{Capability, Value};

lazy_static! {
    // "jdbc:" followed by a subprotocol and its own colon, anything after that is driver specific
    static ref JDBC_URL: Regex = Regex::new(r"^jdbc:[^:]+:").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Str,
    PosInt,
    Bool,
    Keyword,
    SimpleSymbol,
    Map,
    Vector,
    Callable,
    // a callable accepting at least one of the listed argument counts
    CallableWith(&'static [usize]),
    Class,
    JdbcUrl,
    Capable(Capability),
}

impl Predicate {
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Predicate::Str => matches!(value, Value::Str(_)),
            Predicate::PosInt => matches!(value, Value::Int(i) if *i > 0),
            Predicate::Bool => matches!(value, Value::Bool(_)),
            Predicate::Keyword => matches!(value, Value::Keyword(_)),
            Predicate::SimpleSymbol => matches!(value, Value::Symbol(s) if s.is_simple()),
            Predicate::Map => matches!(value, Value::Map(_)),
            Predicate::Vector => matches!(value, Value::Vector(_)),
            Predicate::Callable => matches!(value, Value::Fn(_)),
            Predicate::CallableWith(arities) => match value {
                Value::Fn(f) => arities.iter().any(|n| f.accepts(*n)),
                _ => false,
            },
            Predicate::Class => matches!(value, Value::Class(_)),
            Predicate::JdbcUrl => value.as_str().is_some_and(is_jdbc_url),
            Predicate::Capable(capability) => match value {
                Value::Handle(h) => h.satisfies(*capability),
                _ => false,
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Predicate::Str => "a string".into(),
            Predicate::PosInt => "a positive integer".into(),
            Predicate::Bool => "a boolean".into(),
            Predicate::Keyword => "a keyword".into(),
            Predicate::SimpleSymbol => "an unqualified symbol".into(),
            Predicate::Map => "a map".into(),
            Predicate::Vector => "a vector".into(),
            Predicate::Callable => "a function".into(),
            Predicate::CallableWith(arities) => {
                let counts: Vec<String> = arities.iter().map(|n| n.to_string()).collect();
                format!("a function taking {} argument(s)", counts.join(" or "))
            }
            Predicate::Class => "a class".into(),
            Predicate::JdbcUrl => "a url of the form jdbc:<subprotocol>:...".into(),
            Predicate::Capable(capability) => capability.describe().into(),
        }
    }
}

pub fn is_jdbc_url(url: &str) -> bool {
    JDBC_URL.is_match(url)
}
