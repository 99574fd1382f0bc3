use serde::Serialize;
use serde_json::Value;

use crate::{ops::QueryOp, path::FieldPath};

/// Immutable predicate expression tree over document fields.
///
/// Built by client code through the constructor functions; read-only to the
/// compiler. Logical combinators own their children, so a tree is cheap to
/// move into a query and is never shared across compilations.
#[derive(Clone, Debug)]
pub enum Predicate {
    Eq { path: FieldPath, value: Value },
    Ne { path: FieldPath, value: Value },
    Lt { path: FieldPath, value: Value },
    Gt { path: FieldPath, value: Value },
    Loe { path: FieldPath, value: Value },
    Goe { path: FieldPath, value: Value },
    EqIgnoreCase { path: FieldPath, value: String },
    Like { path: FieldPath, pattern: String, ignore_case: bool },
    StartsWith { path: FieldPath, prefix: String, ignore_case: bool },
    EndsWith { path: FieldPath, suffix: String, ignore_case: bool },
    ContainsStr { path: FieldPath, needle: String, ignore_case: bool },
    /// Regular-expression match (`regexp_like`).
    Matches { path: FieldPath, pattern: String },
    /// Inclusive range.
    Between { path: FieldPath, low: Value, high: Value },
    In { path: FieldPath, values: Vec<Value> },
    NotIn { path: FieldPath, values: Vec<Value> },
    /// Stored literal null. Not the complement of [`Predicate::IsNotNull`]:
    /// a document without the field matches neither.
    IsNull(FieldPath),
    IsNotNull(FieldPath),
    /// Field present in the document (`is not missing`).
    Exists(FieldPath),
    /// Empty string or stored null.
    IsEmpty(FieldPath),
    LengthEq { path: FieldPath, len: i64 },
    /// Element match over an embedded collection: any element satisfying the
    /// conjunction of `conditions`, whose paths are relative to the element.
    ElemMatch { path: FieldPath, conditions: Vec<Predicate> },
    /// Guaranteed-false filter.
    NoMatch,
    /// Geo operator carried by identity; compiled only if the operator
    /// registry marks it supported.
    Geo { op: QueryOp, path: FieldPath, args: Vec<Value> },
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    fn to_value<T>(value: T) -> Value
    where
        T: Serialize,
    {
        serde_json::to_value(value).expect("serializable value")
    }

    pub fn eq(path: impl Into<FieldPath>, value: impl Serialize) -> Self {
        Self::Eq { path: path.into(), value: Self::to_value(value) }
    }

    pub fn ne(path: impl Into<FieldPath>, value: impl Serialize) -> Self {
        Self::Ne { path: path.into(), value: Self::to_value(value) }
    }

    pub fn lt(path: impl Into<FieldPath>, value: impl Serialize) -> Self {
        Self::Lt { path: path.into(), value: Self::to_value(value) }
    }

    pub fn gt(path: impl Into<FieldPath>, value: impl Serialize) -> Self {
        Self::Gt { path: path.into(), value: Self::to_value(value) }
    }

    pub fn loe(path: impl Into<FieldPath>, value: impl Serialize) -> Self {
        Self::Loe { path: path.into(), value: Self::to_value(value) }
    }

    pub fn goe(path: impl Into<FieldPath>, value: impl Serialize) -> Self {
        Self::Goe { path: path.into(), value: Self::to_value(value) }
    }

    pub fn eq_ignore_case(path: impl Into<FieldPath>, value: impl Into<String>) -> Self {
        Self::EqIgnoreCase { path: path.into(), value: value.into() }
    }

    pub fn like(path: impl Into<FieldPath>, pattern: impl Into<String>) -> Self {
        Self::Like { path: path.into(), pattern: pattern.into(), ignore_case: false }
    }

    pub fn like_ignore_case(path: impl Into<FieldPath>, pattern: impl Into<String>) -> Self {
        Self::Like { path: path.into(), pattern: pattern.into(), ignore_case: true }
    }

    pub fn starts_with(path: impl Into<FieldPath>, prefix: impl Into<String>) -> Self {
        Self::StartsWith { path: path.into(), prefix: prefix.into(), ignore_case: false }
    }

    pub fn starts_with_ignore_case(path: impl Into<FieldPath>, prefix: impl Into<String>) -> Self {
        Self::StartsWith { path: path.into(), prefix: prefix.into(), ignore_case: true }
    }

    pub fn ends_with(path: impl Into<FieldPath>, suffix: impl Into<String>) -> Self {
        Self::EndsWith { path: path.into(), suffix: suffix.into(), ignore_case: false }
    }

    pub fn ends_with_ignore_case(path: impl Into<FieldPath>, suffix: impl Into<String>) -> Self {
        Self::EndsWith { path: path.into(), suffix: suffix.into(), ignore_case: true }
    }

    pub fn contains(path: impl Into<FieldPath>, needle: impl Into<String>) -> Self {
        Self::ContainsStr { path: path.into(), needle: needle.into(), ignore_case: false }
    }

    pub fn contains_ignore_case(path: impl Into<FieldPath>, needle: impl Into<String>) -> Self {
        Self::ContainsStr { path: path.into(), needle: needle.into(), ignore_case: true }
    }

    pub fn matches(path: impl Into<FieldPath>, pattern: impl Into<String>) -> Self {
        Self::Matches { path: path.into(), pattern: pattern.into() }
    }

    pub fn between(path: impl Into<FieldPath>, low: impl Serialize, high: impl Serialize) -> Self {
        Self::Between {
            path: path.into(),
            low: Self::to_value(low),
            high: Self::to_value(high),
        }
    }

    pub fn r#in<I, V>(path: impl Into<FieldPath>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Serialize,
    {
        Self::In {
            path: path.into(),
            values: values.into_iter().map(Self::to_value).collect(),
        }
    }

    pub fn not_in<I, V>(path: impl Into<FieldPath>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Serialize,
    {
        Self::NotIn {
            path: path.into(),
            values: values.into_iter().map(Self::to_value).collect(),
        }
    }

    pub fn is_null(path: impl Into<FieldPath>) -> Self {
        Self::IsNull(path.into())
    }

    pub fn is_not_null(path: impl Into<FieldPath>) -> Self {
        Self::IsNotNull(path.into())
    }

    pub fn exists(path: impl Into<FieldPath>) -> Self {
        Self::Exists(path.into())
    }

    pub fn is_empty(path: impl Into<FieldPath>) -> Self {
        Self::IsEmpty(path.into())
    }

    pub fn length_eq(path: impl Into<FieldPath>, len: i64) -> Self {
        Self::LengthEq { path: path.into(), len }
    }

    pub fn elem_match(path: impl Into<FieldPath>, conditions: Vec<Predicate>) -> Self {
        Self::ElemMatch { path: path.into(), conditions }
    }

    pub fn no_match() -> Self {
        Self::NoMatch
    }

    pub fn near(path: impl Into<FieldPath>, x: f64, y: f64) -> Self {
        Self::Geo {
            op: QueryOp::Near,
            path: path.into(),
            args: vec![Self::to_value(x), Self::to_value(y)],
        }
    }

    pub fn near_sphere(path: impl Into<FieldPath>, x: f64, y: f64) -> Self {
        Self::Geo {
            op: QueryOp::NearSphere,
            path: path.into(),
            args: vec![Self::to_value(x), Self::to_value(y)],
        }
    }

    pub fn geo_within_box(
        path: impl Into<FieldPath>,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Self {
        Self::Geo {
            op: QueryOp::GeoWithinBox,
            path: path.into(),
            args: vec![
                Self::to_value(x1),
                Self::to_value(y1),
                Self::to_value(x2),
                Self::to_value(y2),
            ],
        }
    }

    pub fn negate(predicate: Predicate) -> Self {
        Self::Not(Box::new(predicate))
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Self::And(predicates)
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Self::Or(predicates)
    }

    /// Chains `self and other`, in order.
    pub fn and_then(self, other: Predicate) -> Self {
        match self {
            Self::And(mut predicates) => {
                predicates.push(other);
                Self::And(predicates)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Chains `self or other`, in order.
    pub fn or_else(self, other: Predicate) -> Self {
        match self {
            Self::Or(mut predicates) => {
                predicates.push(other);
                Self::Or(predicates)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Wraps `self` in a negation. Double negation is preserved, not
    /// simplified.
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}
