//! In-memory [`DocumentTemplate`] for tests and examples. Evaluates predicate
//! trees structurally against `serde_json` documents with the backend's
//! three-valued logic: a comparison against a missing or stored-null field is
//! unknown, not false, so negation over it still matches nothing. `is null`
//! matches only a stored literal null; an absent field matches neither
//! `is null` nor `is not null`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::{Error, Result},
    path::FieldPath,
    predicate::Predicate,
    query::QuerySpec,
    serializer::SortDirection,
    template::{DocumentTemplate, FetchCursor},
};

#[derive(Default)]
pub struct MemoryTemplate {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_many(&self, collection: &str, documents: Vec<Value>) {
        let mut map = self.collections.write().expect("collections poisoned");
        map.entry(collection.to_string()).or_default().extend(documents);
    }

    fn matching(&self, query: &QuerySpec) -> Result<Vec<Value>> {
        let map = self.collections.read().expect("collections poisoned");
        let docs = map.get(query.collection()).cloned().unwrap_or_default();
        drop(map);

        let mut rows = Vec::new();
        for doc in docs {
            let keep = match query.filter() {
                Some(predicate) => eval(predicate, &doc)? == Truth::True,
                None => true,
            };
            if keep {
                rows.push(doc);
            }
        }

        if !query.sort().is_empty() {
            let keys: Vec<(FieldPath, SortDirection)> = query
                .sort()
                .iter()
                .map(|(field, direction)| (FieldPath::from(field.as_str()), *direction))
                .collect();
            rows.sort_by(|a, b| {
                for (path, direction) in &keys {
                    let ord = compare_optional(lookup(a, path), lookup(b, path));
                    let ord = match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = query.offset().unwrap_or(0).max(0) as usize;
        let rows = rows.into_iter().skip(offset);
        let rows: Vec<Value> = match query.limit() {
            Some(limit) => rows.take(limit.max(0) as usize).collect(),
            None => rows.collect(),
        };
        Ok(rows)
    }
}

#[async_trait]
impl DocumentTemplate for MemoryTemplate {
    async fn find(&self, query: &QuerySpec) -> Result<Vec<Value>> {
        let rows = self.matching(query)?;
        if query.projection().is_empty() {
            return Ok(rows);
        }
        Ok(rows
            .into_iter()
            .map(|doc| {
                let mut out = serde_json::Map::new();
                for (alias, field) in query.projection() {
                    if let Some(value) = lookup(&doc, &FieldPath::from(field.as_str())) {
                        out.insert(alias.clone(), value.clone());
                    }
                }
                Value::Object(out)
            })
            .collect())
    }

    async fn count(&self, query: &QuerySpec) -> Result<u64> {
        Ok(self.matching(query)?.len() as u64)
    }

    async fn find_distinct(&self, query: &QuerySpec, field: &str) -> Result<Vec<Value>> {
        let path = FieldPath::from(field);
        let mut distinct: Vec<Value> = Vec::new();
        for doc in self.matching(query)? {
            if let Some(value) = lookup(&doc, &path) {
                if !value.is_null() && !distinct.contains(value) {
                    distinct.push(value.clone());
                }
            }
        }
        Ok(distinct)
    }

    async fn open_stream(&self, query: &QuerySpec) -> Result<Box<dyn FetchCursor>> {
        let rows = self.matching(query)?;
        Ok(Box::new(MemoryCursor { rows: rows.into_iter(), closed: false }))
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<()> {
        self.insert_many(collection, vec![document]);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let mut map = self.collections.write().expect("collections poisoned");
        let docs = map
            .get_mut(collection)
            .ok_or_else(|| Error::Backend(format!("unknown collection: {collection}")))?;
        for doc in docs.iter_mut() {
            if doc.get("id").and_then(Value::as_str) == Some(id) {
                *doc = document;
                return Ok(());
            }
        }
        Err(Error::Backend(format!("document not found: {id}")))
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<()> {
        let mut map = self.collections.write().expect("collections poisoned");
        let docs = map
            .get_mut(collection)
            .ok_or_else(|| Error::Backend(format!("unknown collection: {collection}")))?;
        let before = docs.len();
        docs.retain(|doc| doc.get("id").and_then(Value::as_str) != Some(id));
        if docs.len() == before {
            return Err(Error::Backend(format!("document not found: {id}")));
        }
        Ok(())
    }
}

struct MemoryCursor {
    rows: std::vec::IntoIter<Value>,
    closed: bool,
}

#[async_trait]
impl FetchCursor for MemoryCursor {
    async fn try_next(&mut self) -> Result<Option<Value>> {
        if self.closed {
            return Err(Error::StreamClosed);
        }
        Ok(self.rows.next())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}

/// Kleene truth value. Comparisons over missing/null fields are unknown and
/// stay unknown through negation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn known(value: bool) -> Self {
        if value {
            Truth::True
        } else {
            Truth::False
        }
    }

    fn negate(self) -> Self {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

/// Resolves a path against a document. `None` means the field is missing,
/// which is distinct from a stored literal null.
fn lookup<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.parts() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Field value if present and not a stored null.
fn present<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    lookup(doc, path).filter(|v| !v.is_null())
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

fn ordered(doc: &Value, path: &FieldPath, value: &Value, accept: &[Ordering]) -> Truth {
    match present(doc, path).and_then(|v| compare(v, value)) {
        Some(ord) => Truth::known(accept.contains(&ord)),
        None => Truth::Unknown,
    }
}

fn on_string(doc: &Value, path: &FieldPath, test: impl FnOnce(&str) -> bool) -> Truth {
    match present(doc, path).and_then(Value::as_str) {
        Some(s) => Truth::known(test(s)),
        None => Truth::Unknown,
    }
}

fn fold_case(s: &str, ignore_case: bool) -> String {
    if ignore_case {
        s.to_uppercase()
    } else {
        s.to_string()
    }
}

/// Structural evaluation of a predicate against one document.
fn eval(predicate: &Predicate, doc: &Value) -> Result<Truth> {
    Ok(match predicate {
        Predicate::Eq { path, value } => match present(doc, path) {
            Some(v) => Truth::known(v == value),
            None => Truth::Unknown,
        },
        Predicate::Ne { path, value } => match present(doc, path) {
            Some(v) => Truth::known(v != value),
            None => Truth::Unknown,
        },
        Predicate::Lt { path, value } => ordered(doc, path, value, &[Ordering::Less]),
        Predicate::Gt { path, value } => ordered(doc, path, value, &[Ordering::Greater]),
        Predicate::Loe { path, value } => {
            ordered(doc, path, value, &[Ordering::Less, Ordering::Equal])
        }
        Predicate::Goe { path, value } => {
            ordered(doc, path, value, &[Ordering::Greater, Ordering::Equal])
        }
        Predicate::EqIgnoreCase { path, value } => {
            on_string(doc, path, |s| s.to_uppercase() == value.to_uppercase())
        }
        Predicate::Like { path, pattern, ignore_case } => {
            let pattern = like_to_regex(&fold_case(pattern, *ignore_case));
            let re = regex::Regex::new(&pattern)
                .map_err(|e| Error::MalformedExpression(format!("invalid like: {e}")))?;
            on_string(doc, path, |s| re.is_match(&fold_case(s, *ignore_case)))
        }
        Predicate::StartsWith { path, prefix, ignore_case } => {
            let prefix = fold_case(prefix, *ignore_case);
            on_string(doc, path, |s| fold_case(s, *ignore_case).starts_with(&prefix))
        }
        Predicate::EndsWith { path, suffix, ignore_case } => {
            let suffix = fold_case(suffix, *ignore_case);
            on_string(doc, path, |s| fold_case(s, *ignore_case).ends_with(&suffix))
        }
        Predicate::ContainsStr { path, needle, ignore_case } => {
            let needle = fold_case(needle, *ignore_case);
            on_string(doc, path, |s| fold_case(s, *ignore_case).contains(&needle))
        }
        Predicate::Matches { path, pattern } => {
            let re = regex::Regex::new(&format!("^(?:{pattern})$"))
                .map_err(|e| Error::MalformedExpression(format!("invalid regex: {e}")))?;
            on_string(doc, path, |s| re.is_match(s))
        }
        Predicate::Between { path, low, high } => match present(doc, path) {
            Some(v) => Truth::known(
                matches!(compare(v, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(v, high), Some(Ordering::Less | Ordering::Equal)),
            ),
            None => Truth::Unknown,
        },
        Predicate::In { path, values } => match present(doc, path) {
            Some(v) => Truth::known(values.contains(v)),
            None => Truth::Unknown,
        },
        Predicate::NotIn { path, values } => match present(doc, path) {
            Some(v) => Truth::known(!values.contains(v)),
            None => Truth::Unknown,
        },
        Predicate::IsNull(path) => Truth::known(matches!(lookup(doc, path), Some(Value::Null))),
        Predicate::IsNotNull(path) => {
            Truth::known(matches!(lookup(doc, path), Some(v) if !v.is_null()))
        }
        Predicate::Exists(path) => Truth::known(lookup(doc, path).is_some()),
        Predicate::IsEmpty(path) => Truth::known(match lookup(doc, path) {
            Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            _ => false,
        }),
        Predicate::LengthEq { path, len } => {
            on_string(doc, path, |s| s.chars().count() as i64 == *len)
        }
        Predicate::ElemMatch { path, conditions } => match lookup(doc, path) {
            Some(Value::Array(items)) => {
                let mut matched = false;
                for item in items {
                    let mut all = true;
                    for condition in conditions {
                        if eval(condition, item)? != Truth::True {
                            all = false;
                            break;
                        }
                    }
                    if all {
                        matched = true;
                        break;
                    }
                }
                Truth::known(matched)
            }
            Some(_) => Truth::False,
            None => Truth::Unknown,
        },
        Predicate::NoMatch => Truth::False,
        Predicate::Geo { op, .. } => return Err(Error::UnsupportedOperator(op.name())),
        Predicate::Not(inner) => eval(inner, doc)?.negate(),
        Predicate::And(predicates) => {
            let mut out = Truth::True;
            for predicate in predicates {
                match eval(predicate, doc)? {
                    Truth::False => return Ok(Truth::False),
                    Truth::Unknown => out = Truth::Unknown,
                    Truth::True => {}
                }
            }
            out
        }
        Predicate::Or(predicates) => {
            let mut out = Truth::False;
            for predicate in predicates {
                match eval(predicate, doc)? {
                    Truth::True => return Ok(Truth::True),
                    Truth::Unknown => out = Truth::Unknown,
                    Truth::False => {}
                }
            }
            out
        }
    })
}
