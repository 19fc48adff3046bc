// used for timestamp values
use chrono::NaiveDateTime;
// used for decimal values
use bigdecimal::BigDecimal;
// used when decoding argument lists from JSON
use serde_json::Value as Json;

// used when parsing decimals and timestamps
use std::str::FromStr;
// used to print out readable forms of a value
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SqlshapeError};

// keys whose values never make it into a report
const SENSITIVE_KEYS: &[&str] = &["password"];
// reports show at most this many characters of an offending value
const SUMMARY_LIMIT: usize = 120;

/// Whether values stored under a key of this name are kept out of reports.
/// Takes the bare name, a keyword like `:password` or a qualified `:db/password`.
pub fn is_sensitive_key(key: &str) -> bool {
    let name = key.strip_prefix(':').unwrap_or(key);
    let name = name.rsplit_once('/').map_or(name, |(_, name)| name);
    SENSITIVE_KEYS.contains(&name)
}

// ------------- Keyword & Symbol -------------
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyword {
    ns: Option<String>,
    name: String,
}
impl Keyword {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ns: None,
            name: name.into(),
        }
    }
    pub fn qualified(ns: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ns: Some(ns.into()),
            name: name.into(),
        }
    }
    // accepts both ":ns/name" and "ns/name"
    pub fn parse(s: &str) -> Self {
        let s = s.strip_prefix(':').unwrap_or(s);
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Self::qualified(ns, name),
            _ => Self::new(s),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_simple(&self) -> bool {
        self.ns.is_none()
    }
}
impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, ":{}/{}", ns, self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    ns: Option<String>,
    name: String,
}
impl Symbol {
    pub fn parse(s: &str) -> Self {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Self {
                ns: Some(ns.to_owned()),
                name: name.to_owned(),
            },
            _ => Self {
                ns: None,
                name: s.to_owned(),
            },
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_simple(&self) -> bool {
        self.ns.is_none()
    }
}
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

// ------------- Callables & types -------------
/// Reference to something callable, along with the argument counts it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnRef {
    name: String,
    arities: Vec<usize>,
    variadic: bool,
}
impl FnRef {
    pub fn new(name: impl Into<String>, arities: &[usize]) -> Self {
        Self {
            name: name.into(),
            arities: arities.to_vec(),
            variadic: false,
        }
    }
    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arities: Vec::new(),
            variadic: true,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn accepts(&self, arity: usize) -> bool {
        self.variadic || self.arities.contains(&arity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef(String);
impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
    pub fn name(&self) -> &str {
        &self.0
    }
}

// ------------- Handles -------------
/// Capabilities an opaque object can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Connection,
    DataSource,
    PreparedStatement,
    Statement,
    Connectable,
    Sourceable,
}
impl Capability {
    pub fn describe(&self) -> &'static str {
        match self {
            Capability::Connection => "a live connection",
            Capability::DataSource => "a datasource",
            Capability::PreparedStatement => "a prepared statement",
            Capability::Statement => "a statement",
            Capability::Connectable => "something Connectable",
            Capability::Sourceable => "something Sourceable",
        }
    }
}
impl FromStr for Capability {
    type Err = SqlshapeError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "connection" => Ok(Capability::Connection),
            "datasource" => Ok(Capability::DataSource),
            "preparedstatement" => Ok(Capability::PreparedStatement),
            "statement" => Ok(Capability::Statement),
            "connectable" => Ok(Capability::Connectable),
            "sourceable" => Ok(Capability::Sourceable),
            _ => Err(SqlshapeError::Decode(format!("unknown capability: {}", s))),
        }
    }
}

/// Implemented by the data-access layer for every live object it hands out.
/// The contracts only ever ask; they never decide what an object can do.
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &str;
    fn satisfies(&self, capability: Capability) -> bool;
}

/// A resource that simply lists what it can do.
#[derive(Debug, Clone)]
pub struct DeclaredResource {
    type_name: String,
    capabilities: Vec<Capability>,
}
impl DeclaredResource {
    pub fn new(type_name: impl Into<String>, capabilities: &[Capability]) -> Self {
        Self {
            type_name: type_name.into(),
            capabilities: capabilities.to_vec(),
        }
    }
}
impl Resource for DeclaredResource {
    fn type_name(&self) -> &str {
        &self.type_name
    }
    fn satisfies(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Clone)]
pub struct Handle(Arc<dyn Resource>);
impl Handle {
    pub fn new(resource: impl Resource + 'static) -> Self {
        Self(Arc::new(resource))
    }
    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }
    pub fn satisfies(&self, capability: Capability) -> bool {
        self.0.satisfies(capability)
    }
}
// handles are identity checked
impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({})", self.type_name())
    }
}

// ------------- Value -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
    Inst(NaiveDateTime),
    Str(String),
    Keyword(Keyword),
    Symbol(Symbol),
    Vector(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Fn(FnRef),
    Class(TypeRef),
    Handle(Handle),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }
    pub fn kw(s: &str) -> Self {
        Value::Keyword(Keyword::parse(s))
    }
    pub fn sym(s: &str) -> Self {
        Value::Symbol(Symbol::parse(s))
    }
    pub fn vector(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Vector(items.into_iter().collect())
    }
    /// Map with simple keyword keys, in the order given.
    pub fn map<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::kw(k), v))
                .collect(),
        )
    }
    pub fn function(name: &str, arities: &[usize]) -> Self {
        Value::Fn(FnRef::new(name, arities))
    }
    pub fn class(name: &str) -> Self {
        Value::Class(TypeRef::new(name))
    }
    pub fn handle(resource: impl Resource + 'static) -> Self {
        Value::Handle(Handle::new(resource))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Inst(_) => "timestamp",
            Value::Str(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::Vector(_) => "vector",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Fn(_) => "function",
            Value::Class(_) => "class",
            Value::Handle(_) => "object",
        }
    }
    /// Elements of any collection except maps.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(items) | Value::List(items) | Value::Set(items) => Some(items.as_slice()),
            _ => None,
        }
    }
    pub fn entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }
    /// Looks up a simple keyword key in a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries()?.iter().find_map(|(k, v)| match k {
            Value::Keyword(kw) if kw.is_simple() && kw.name() == key => Some(v),
            _ => None,
        })
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Bounded rendering used in reports; sensitive map values are masked.
    pub fn summary(&self) -> String {
        let mut rendered = String::new();
        self.render(&mut rendered, true);
        if rendered.chars().count() > SUMMARY_LIMIT {
            rendered = rendered.chars().take(SUMMARY_LIMIT).collect();
            rendered.push_str("...");
        }
        format!("{} ({})", rendered, self.kind())
    }
    /// Stands in for [`Value::summary`] when the value sits under a sensitive key.
    pub fn masked_summary(&self) -> String {
        format!("\"****\" ({})", self.kind())
    }

    fn render(&self, out: &mut String, mask: bool) {
        match self {
            Value::Nil => out.push_str("nil"),
            Value::Bool(b) => out.push_str(&b.to_string()),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Float(x) => out.push_str(&x.to_string()),
            Value::Decimal(d) => {
                out.push_str(&d.to_string());
                out.push('M');
            }
            Value::Inst(t) => out.push_str(&format!("#inst \"{}\"", t)),
            Value::Str(s) => out.push_str(&format!("{:?}", s)),
            Value::Keyword(k) => out.push_str(&k.to_string()),
            Value::Symbol(s) => out.push_str(&s.to_string()),
            Value::Vector(items) => render_items(out, "[", items, "]", mask),
            Value::List(items) => render_items(out, "(", items, ")", mask),
            Value::Set(items) => render_items(out, "#{", items, "}", mask),
            Value::Map(entries) => {
                out.push('{');
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    k.render(out, mask);
                    out.push(' ');
                    let sensitive = matches!(k, Value::Keyword(kw) if is_sensitive_key(kw.name()));
                    if mask && sensitive {
                        out.push_str("\"****\"");
                    } else {
                        v.render(out, mask);
                    }
                }
                out.push('}');
            }
            Value::Fn(f) => out.push_str(&format!("#fn[{}]", f.name())),
            Value::Class(t) => out.push_str(t.name()),
            Value::Handle(h) => out.push_str(&format!("#object[{}]", h.type_name())),
        }
    }

    // ------------- JSON decoding -------------
    pub fn from_json(json: &Json) -> Result<Value> {
        Ok(match json {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) if s.len() > 1 && s.starts_with(':') => Value::kw(s),
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::Vector(decode_all(items)?),
            Json::Object(object) => {
                if object.len() == 1 {
                    if let Some((tag, body)) = object.iter().next() {
                        if tag.starts_with('$') {
                            return decode_tagged(tag, body);
                        }
                    }
                }
                let mut entries = Vec::with_capacity(object.len());
                for (k, v) in object {
                    entries.push((Value::kw(k), Value::from_json(v)?));
                }
                Value::Map(entries)
            }
        })
    }
}

fn render_items(out: &mut String, open: &str, items: &[Value], close: &str, mask: bool) {
    out.push_str(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        item.render(out, mask);
    }
    out.push_str(close);
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut rendered = String::new();
        self.render(&mut rendered, false);
        write!(f, "{}", rendered)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<Keyword> for Value {
    fn from(k: Keyword) -> Self {
        Value::Keyword(k)
    }
}

fn decode_all(items: &[Json]) -> Result<Vec<Value>> {
    items.iter().map(Value::from_json).collect()
}

fn decode_tagged(tag: &str, body: &Json) -> Result<Value> {
    let malformed = || SqlshapeError::Decode(format!("malformed {} value: {}", tag, body));
    match tag {
        "$list" => Ok(Value::List(decode_all(body.as_array().ok_or_else(malformed)?)?)),
        "$set" => Ok(Value::Set(decode_all(body.as_array().ok_or_else(malformed)?)?)),
        "$symbol" => Ok(Value::sym(body.as_str().ok_or_else(malformed)?)),
        "$class" => Ok(Value::class(body.as_str().ok_or_else(malformed)?)),
        "$decimal" => {
            let text = body.as_str().ok_or_else(malformed)?;
            BigDecimal::from_str(text)
                .map(Value::Decimal)
                .map_err(|_| malformed())
        }
        "$inst" => {
            let text = body.as_str().ok_or_else(malformed)?;
            NaiveDateTime::from_str(text)
                .map(Value::Inst)
                .map_err(|_| malformed())
        }
        "$fn" => match body {
            Json::String(name) => Ok(Value::Fn(FnRef::variadic(name.as_str()))),
            Json::Object(spec) => {
                let name = spec.get("name").and_then(Json::as_str).unwrap_or("anonymous");
                if spec.get("variadic").and_then(Json::as_bool).unwrap_or(false) {
                    return Ok(Value::Fn(FnRef::variadic(name)));
                }
                let mut arities = Vec::new();
                for arity in spec.get("arities").and_then(Json::as_array).ok_or_else(malformed)? {
                    let n = arity.as_u64().ok_or_else(malformed)?;
                    arities.push(usize::try_from(n).map_err(|_| malformed())?);
                }
                Ok(Value::Fn(FnRef::new(name, &arities)))
            }
            _ => Err(malformed()),
        },
        "$handle" => {
            let type_name = body.get("type").and_then(Json::as_str).ok_or_else(malformed)?;
            let mut capabilities: Vec<Capability> = Vec::new();
            if let Some(declared) = body.get("capabilities") {
                for capability in declared.as_array().ok_or_else(malformed)? {
                    capabilities.push(capability.as_str().ok_or_else(malformed)?.parse()?);
                }
            }
            Ok(Value::handle(DeclaredResource::new(type_name, &capabilities)))
        }
        _ => Err(SqlshapeError::Decode(format!("unknown tag: {}", tag))),
    }
}
