//! Shape combinators.
//!
//! A [`Shape`] is data describing which values are acceptable at a position.
//! Shapes compose by conjunction ([`Shape::And`]), tagged alternation
//! ([`Shape::Or`]), collections ([`Shape::CollOf`], [`Shape::MapOf`],
//! [`Shape::Keys`]), sequence patterns ([`Shape::Cat`]) and cross-field rules
//! ([`Shape::Consistent`]). Conforming a value either yields a [`Conformed`]
//! view of it (recording which labels matched) or a [`ShapeError`] locating
//! the failure.

use crate::error::{Path, Reason, Segment, ShapeError};
use crate::predicate::Predicate;
use crate::value::{is_sensitive_key, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    Required,
    Optional,
    Variadic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollKind {
    Sequential,
    Vector,
}

/// A named element of a [`Shape::Cat`] sequence.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: &'static str,
    pub shape: Shape,
    pub occurs: Occurs,
}
impl Part {
    pub fn req(name: &'static str, shape: Shape) -> Self {
        Self { name, shape, occurs: Occurs::Required }
    }
    pub fn opt(name: &'static str, shape: Shape) -> Self {
        Self { name, shape, occurs: Occurs::Optional }
    }
    pub fn many(name: &'static str, shape: Shape) -> Self {
        Self { name, shape, occurs: Occurs::Variadic }
    }
}

/// A cross-field check run after the inner shape has conformed.
/// Returns the offending indices and a description of what disagrees.
pub type RuleCheck = for<'v> fn(&Conformed<'v>) -> Option<(Vec<usize>, String)>;

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub check: RuleCheck,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Any,
    Pred(Predicate),
    OneOf(Vec<Value>),
    Nilable(Box<Shape>),
    And(Vec<Shape>),
    Or(Vec<(&'static str, Shape)>),
    CollOf {
        elem: Box<Shape>,
        kind: CollKind,
        min_count: usize,
    },
    MapOf {
        key: Box<Shape>,
        val: Box<Shape>,
        min_count: usize,
    },
    // un-namespaced keys, the optional ones are only checked when present
    Keys {
        req: Vec<(&'static str, Shape)>,
        opt: Vec<(&'static str, Shape)>,
    },
    Cat(Vec<Part>),
    Consistent(Box<Shape>, Rule),
    Named(&'static str, Box<Shape>),
}

/// What a value conformed to. Borrows from the conformed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Conformed<'v> {
    Value(&'v Value),
    Tagged(&'static str, Box<Conformed<'v>>),
    Parts(Vec<(&'static str, Conformed<'v>)>),
    Many(Vec<Conformed<'v>>),
}

impl<'v> Conformed<'v> {
    /// Label of the alternative that matched, if this came out of an alternation.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Conformed::Tagged(label, _) => Some(*label),
            _ => None,
        }
    }
    /// Strips any tags.
    pub fn untagged(&self) -> &Conformed<'v> {
        match self {
            Conformed::Tagged(_, inner) => inner.untagged(),
            other => other,
        }
    }
    pub fn part(&self, name: &str) -> Option<&Conformed<'v>> {
        match self.untagged() {
            Conformed::Parts(parts) => parts.iter().find(|(n, _)| *n == name).map(|(_, c)| c),
            _ => None,
        }
    }
    pub fn items(&self) -> Option<&[Conformed<'v>]> {
        match self.untagged() {
            Conformed::Many(items) => Some(items.as_slice()),
            _ => None,
        }
    }
    pub fn value(&self) -> Option<&'v Value> {
        match self.untagged() {
            Conformed::Value(v) => Some(*v),
            _ => None,
        }
    }
}

// shorthand constructors used when declaring schemas
pub fn pred(p: Predicate) -> Shape {
    Shape::Pred(p)
}
pub fn and(shapes: Vec<Shape>) -> Shape {
    Shape::And(shapes)
}
pub fn or(alternatives: Vec<(&'static str, Shape)>) -> Shape {
    Shape::Or(alternatives)
}
pub fn cat(parts: Vec<Part>) -> Shape {
    Shape::Cat(parts)
}
pub fn nilable(shape: Shape) -> Shape {
    Shape::Nilable(Box::new(shape))
}
pub fn named(name: &'static str, shape: Shape) -> Shape {
    Shape::Named(name, Box::new(shape))
}
pub fn one_of(values: Vec<Value>) -> Shape {
    Shape::OneOf(values)
}
pub fn coll_of(elem: Shape, kind: CollKind, min_count: usize) -> Shape {
    Shape::CollOf { elem: Box::new(elem), kind, min_count }
}
pub fn map_of(key: Shape, val: Shape, min_count: usize) -> Shape {
    Shape::MapOf { key: Box::new(key), val: Box::new(val), min_count }
}
pub fn consistent(shape: Shape, rule: Rule) -> Shape {
    Shape::Consistent(Box::new(shape), rule)
}

impl Shape {
    pub fn describe(&self) -> String {
        match self {
            Shape::Any => "anything".into(),
            Shape::Pred(p) => p.describe(),
            Shape::OneOf(values) => {
                let shown: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("one of {}", shown.join(", "))
            }
            Shape::Nilable(inner) => format!("nil or {}", inner.describe()),
            Shape::And(shapes) => {
                let shown: Vec<String> = shapes.iter().map(Shape::describe).collect();
                shown.join(" and ")
            }
            Shape::Or(alternatives) => {
                let shown: Vec<&str> = alternatives.iter().map(|(label, _)| *label).collect();
                format!("one of <{}>", shown.join(" | "))
            }
            Shape::CollOf { elem, kind, min_count } => {
                let noun = match kind {
                    CollKind::Sequential => "sequence",
                    CollKind::Vector => "vector",
                };
                if *min_count > 0 {
                    format!("a {} of at least {} of {}", noun, min_count, elem.describe())
                } else {
                    format!("a {} of {}", noun, elem.describe())
                }
            }
            Shape::MapOf { key, val, .. } => {
                format!("a map of {} to {}", key.describe(), val.describe())
            }
            Shape::Keys { req, .. } => {
                let keys: Vec<String> = req.iter().map(|(k, _)| format!(":{}", k)).collect();
                if keys.is_empty() {
                    "a map".into()
                } else {
                    format!("a map with {}", keys.join(", "))
                }
            }
            Shape::Cat(parts) => {
                let names: Vec<String> = parts
                    .iter()
                    .map(|p| match p.occurs {
                        Occurs::Required => p.name.to_string(),
                        Occurs::Optional => format!("{}?", p.name),
                        Occurs::Variadic => format!("{}*", p.name),
                    })
                    .collect();
                format!("a sequence of ({})", names.join(" "))
            }
            Shape::Consistent(inner, _) => inner.describe(),
            Shape::Named(name, _) => (*name).into(),
        }
    }

    pub fn conform<'v>(&self, value: &'v Value) -> Result<Conformed<'v>, ShapeError> {
        self.conform_at(value, &Path::root())
    }

    pub fn conform_at<'v>(&self, value: &'v Value, path: &Path) -> Result<Conformed<'v>, ShapeError> {
        let mismatch = || ShapeError::mismatch(path.clone(), self.describe(), actual(value, path));
        match self {
            Shape::Any => Ok(Conformed::Value(value)),
            Shape::Pred(p) => {
                if p.test(value) {
                    Ok(Conformed::Value(value))
                } else {
                    Err(mismatch())
                }
            }
            Shape::OneOf(values) => {
                if values.contains(value) {
                    Ok(Conformed::Value(value))
                } else {
                    Err(mismatch())
                }
            }
            Shape::Nilable(inner) => match value {
                Value::Nil => Ok(Conformed::Value(value)),
                _ => inner.conform_at(value, path),
            },
            Shape::And(shapes) => {
                // the most structured view wins, plain predicates pass the value through
                let mut conformed = Conformed::Value(value);
                for shape in shapes {
                    let c = shape.conform_at(value, path)?;
                    if !matches!(c, Conformed::Value(_)) {
                        conformed = c;
                    }
                }
                Ok(conformed)
            }
            Shape::Or(alternatives) => alternate(alternatives, path, |shape, at| shape.conform_at(value, at)),
            Shape::CollOf { elem, kind, min_count } => {
                let items = match (kind, value) {
                    (CollKind::Vector, Value::Vector(items)) => items,
                    (CollKind::Sequential, Value::Vector(items) | Value::List(items)) => items,
                    _ => return Err(mismatch()),
                };
                let mut conformed = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    conformed.push(elem.conform_at(item, &path.child(Segment::Index { index }))?);
                }
                if items.len() < *min_count {
                    return Err(ShapeError::mismatch(
                        path.clone(),
                        format!("at least {} element(s)", min_count),
                        format!("{} element(s)", items.len()),
                    ));
                }
                Ok(Conformed::Many(conformed))
            }
            Shape::MapOf { key, val, min_count } => {
                let entries = value.entries().ok_or_else(mismatch)?;
                for (k, v) in entries {
                    let at = path.child(Segment::Key { key: k.to_string() });
                    key.conform_at(k, &at)?;
                    val.conform_at(v, &at)?;
                }
                if entries.len() < *min_count {
                    return Err(ShapeError::mismatch(
                        path.clone(),
                        format!("at least {} entries", min_count),
                        format!("{} entries", entries.len()),
                    ));
                }
                Ok(Conformed::Value(value))
            }
            Shape::Keys { req, opt } => {
                if value.entries().is_none() {
                    return Err(mismatch());
                }
                let mut parts = Vec::new();
                for (key, shape) in req {
                    let at = path.child(Segment::Key { key: format!(":{}", key) });
                    match value.get(key) {
                        Some(v) => parts.push((*key, shape.conform_at(v, &at)?)),
                        None => {
                            return Err(ShapeError::mismatch(
                                path.clone(),
                                format!("a map containing :{}", key),
                                actual(value, path),
                            ))
                        }
                    }
                }
                for (key, shape) in opt {
                    if let Some(v) = value.get(key) {
                        let at = path.child(Segment::Key { key: format!(":{}", key) });
                        parts.push((*key, shape.conform_at(v, &at)?));
                    }
                }
                Ok(Conformed::Parts(parts))
            }
            Shape::Cat(_) => match value {
                Value::Vector(items) | Value::List(items) => self.conform_seq(items, path),
                _ => Err(mismatch()),
            },
            Shape::Consistent(inner, rule) => {
                let conformed = inner.conform_at(value, path)?;
                apply_rule(rule, conformed, path)
            }
            Shape::Named(_, inner) => inner.conform_at(value, path),
        }
    }

    /// Conforms a sequence of values, such as the arguments of a call, against
    /// a [`Shape::Cat`] or anything wrapping one.
    pub fn conform_seq<'v>(&self, items: &'v [Value], path: &Path) -> Result<Conformed<'v>, ShapeError> {
        match self {
            Shape::Cat(parts) => match match_parts(parts, items, 0, path) {
                Ok(parts) => Ok(Conformed::Parts(parts)),
                Err(failure) => Err(failure.error),
            },
            Shape::Consistent(inner, rule) => {
                let conformed = inner.conform_seq(items, path)?;
                apply_rule(rule, conformed, path)
            }
            Shape::Or(alternatives) => alternate(alternatives, path, |shape, at| shape.conform_seq(items, at)),
            Shape::Named(_, inner) => inner.conform_seq(items, path),
            _ => Err(ShapeError::mismatch(
                path.clone(),
                self.describe(),
                format!("{} value(s)", items.len()),
            )),
        }
    }
}

// anything found under a sensitive key is reported by kind only
fn actual(value: &Value, path: &Path) -> String {
    let sensitive = path.segments().iter().any(|segment| match segment {
        Segment::Key { key } => is_sensitive_key(key),
        _ => false,
    });
    if sensitive {
        value.masked_summary()
    } else {
        value.summary()
    }
}

fn alternate<'v>(
    alternatives: &[(&'static str, Shape)],
    path: &Path,
    attempt: impl Fn(&Shape, &Path) -> Result<Conformed<'v>, ShapeError>,
) -> Result<Conformed<'v>, ShapeError> {
    let mut reasons = Vec::with_capacity(alternatives.len());
    // first full match in declared order wins
    for (label, shape) in alternatives {
        let label = *label;
        match attempt(shape, &path.child(Segment::Label { label })) {
            Ok(c) => return Ok(Conformed::Tagged(label, Box::new(c))),
            Err(error) => reasons.push(Reason { label, error }),
        }
    }
    Err(ShapeError::AlternationExhausted { path: path.clone(), reasons })
}

fn apply_rule<'v>(rule: &Rule, conformed: Conformed<'v>, path: &Path) -> Result<Conformed<'v>, ShapeError> {
    match (rule.check)(&conformed) {
        None => Ok(conformed),
        Some((offending, detail)) => Err(ShapeError::ConsistencyViolation {
            path: path.clone(),
            rule: rule.name,
            offending,
            detail,
        }),
    }
}

// ------------- Sequence matching -------------
struct SeqFailure {
    consumed: usize,
    error: ShapeError,
}

// keeps the failure that got furthest into the input, the earlier one on ties
fn deeper(best: Option<SeqFailure>, other: SeqFailure) -> SeqFailure {
    match best {
        Some(best) if best.consumed >= other.consumed => best,
        _ => other,
    }
}

type Matched<'v> = Vec<(&'static str, Conformed<'v>)>;

fn match_parts<'v>(
    parts: &[Part],
    items: &'v [Value],
    offset: usize,
    path: &Path,
) -> Result<Matched<'v>, SeqFailure> {
    let Some((part, rest)) = parts.split_first() else {
        return match items.get(offset) {
            None => Ok(Vec::new()),
            Some(extra) => Err(SeqFailure {
                consumed: offset,
                error: ShapeError::mismatch(
                    path.child(Segment::Index { index: offset }),
                    "no further input",
                    extra.summary(),
                ),
            }),
        };
    };
    let at = |position: usize| path.child(Segment::Part { name: part.name, position });
    match part.occurs {
        Occurs::Required => {
            let Some(item) = items.get(offset) else {
                return Err(SeqFailure {
                    consumed: offset,
                    error: ShapeError::mismatch(at(offset), part.shape.describe(), "insufficient input"),
                });
            };
            let conformed = part
                .shape
                .conform_at(item, &at(offset))
                .map_err(|error| SeqFailure { consumed: offset, error })?;
            let mut matched = match_parts(rest, items, offset + 1, path)?;
            matched.insert(0, (part.name, conformed));
            Ok(matched)
        }
        Occurs::Optional => {
            let mut best = None;
            if let Some(item) = items.get(offset) {
                match part.shape.conform_at(item, &at(offset)) {
                    Ok(conformed) => match match_parts(rest, items, offset + 1, path) {
                        Ok(mut matched) => {
                            matched.insert(0, (part.name, conformed));
                            return Ok(matched);
                        }
                        Err(failure) => best = Some(failure),
                    },
                    Err(error) => best = Some(SeqFailure { consumed: offset, error }),
                }
            }
            match_parts(rest, items, offset, path).map_err(|failure| deeper(best, failure))
        }
        Occurs::Variadic => {
            let mut taken = Vec::new();
            let mut best = None;
            for (i, item) in items[offset.min(items.len())..].iter().enumerate() {
                match part.shape.conform_at(item, &at(offset + i)) {
                    Ok(conformed) => taken.push(conformed),
                    Err(error) => {
                        best = Some(SeqFailure { consumed: offset + i, error });
                        break;
                    }
                }
            }
            // greedy first, then give items back to the parts that follow
            loop {
                match match_parts(rest, items, offset + taken.len(), path) {
                    Ok(mut matched) => {
                        matched.insert(0, (part.name, Conformed::Many(taken)));
                        return Ok(matched);
                    }
                    Err(failure) => {
                        let failure = deeper(best, failure);
                        if taken.pop().is_none() {
                            return Err(failure);
                        }
                        best = Some(failure);
                    }
                }
            }
        }
    }
}
