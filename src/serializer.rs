use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::{
    error::{Error, Result},
    ops::QueryOp,
    path::FieldPath,
    predicate::Predicate,
};

/// Direction for sorting results.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A single sort key.
#[derive(Clone, Debug)]
pub struct OrderSpecifier {
    pub path: FieldPath,
    pub direction: SortDirection,
}

impl OrderSpecifier {
    pub fn asc(path: impl Into<FieldPath>) -> Self {
        Self { path: path.into(), direction: SortDirection::Asc }
    }

    pub fn desc(path: impl Into<FieldPath>) -> Self {
        Self { path: path.into(), direction: SortDirection::Desc }
    }
}

/// Output field selection: alias to source field. Insertion order is not
/// significant; the compiled form is a sorted map.
#[derive(Clone, Debug, Default)]
pub struct Projection {
    fields: Vec<(String, FieldPath)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, alias: impl Into<String>, path: impl Into<FieldPath>) -> Self {
        self.fields.push((alias.into(), path.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A compiled boolean filter: the ` WHERE …` clause and its positional
/// parameters. Placeholders are 1-based, gap-free and numbered in emission
/// order, so `$n` always refers to `params[n - 1]`.
#[derive(Clone, Debug, Default)]
pub struct CompiledFilter {
    clause: String,
    params: Vec<Value>,
}

impl CompiledFilter {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    /// Human-readable rendering of clause plus bound parameters for
    /// diagnostics and logging. Stable, but not guaranteed executable.
    pub fn export(&self) -> String {
        if self.is_empty() {
            return String::from("<unfiltered>");
        }
        let mut out = self.clause.clone();
        if !self.params.is_empty() {
            out.push_str(" [");
            for (i, value) in self.params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format!("${}={}", i + 1, value));
            }
            out.push(']');
        }
        out
    }
}

impl fmt::Display for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause)
    }
}

/// Compiles predicate trees into N1QL filter fragments.
///
/// The serializer is stateless; every call allocates its own parameter list,
/// so concurrent compilations never share state.
#[derive(Clone, Copy, Debug, Default)]
pub struct N1qlSerializer;

impl N1qlSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Compiles a predicate tree into a ` WHERE …` clause with positional
    /// parameters. Fails fast on unsupported operators and malformed paths;
    /// never produces a partially compiled filter.
    pub fn compile(&self, predicate: &Predicate) -> Result<CompiledFilter> {
        let mut params = Vec::new();
        let body = self.serialize(predicate, None, &mut params)?;
        Ok(CompiledFilter { clause: format!(" WHERE {body}"), params })
    }

    /// Compiles sort keys into rendered `(field, direction)` pairs.
    pub fn compile_sort(
        &self,
        order: &[OrderSpecifier],
    ) -> Result<Vec<(String, SortDirection)>> {
        order
            .iter()
            .map(|spec| Ok((self.field(&spec.path, None)?, spec.direction)))
            .collect()
    }

    /// Compiles a projection into an alias → field map.
    pub fn compile_projection(&self, projection: &Projection) -> Result<BTreeMap<String, String>> {
        let mut fields = BTreeMap::new();
        for (alias, path) in &projection.fields {
            if alias.is_empty() {
                return Err(Error::MalformedExpression(
                    "projection alias must not be empty".into(),
                ));
            }
            fields.insert(alias.clone(), self.field(path, None)?);
        }
        Ok(fields)
    }

    fn field(&self, path: &FieldPath, prefix: Option<&str>) -> Result<String> {
        if path.is_empty() || path.parts().iter().any(String::is_empty) {
            return Err(Error::UnknownFieldPath(path.render()));
        }
        Ok(match prefix {
            Some(prefix) => format!("{prefix}.{}", path.render()),
            None => path.render(),
        })
    }

    fn bind(params: &mut Vec<Value>, value: Value) -> String {
        params.push(value);
        format!("${}", params.len())
    }

    fn serialize(
        &self,
        predicate: &Predicate,
        prefix: Option<&str>,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        match predicate {
            Predicate::Eq { path, value } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, value.clone());
                Ok(format!("{f} = {p}"))
            }
            Predicate::Ne { path, value } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, value.clone());
                Ok(format!("{f} != {p}"))
            }
            Predicate::Lt { path, value } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, value.clone());
                Ok(format!("{f} < {p}"))
            }
            Predicate::Gt { path, value } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, value.clone());
                Ok(format!("{f} > {p}"))
            }
            Predicate::Loe { path, value } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, value.clone());
                Ok(format!("{f} <= {p}"))
            }
            Predicate::Goe { path, value } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, value.clone());
                Ok(format!("{f} >= {p}"))
            }
            Predicate::EqIgnoreCase { path, value } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, Value::String(value.to_uppercase()));
                Ok(format!("UPPER({f}) = {p}"))
            }
            Predicate::Like { path, pattern, ignore_case } => {
                let f = self.field(path, prefix)?;
                if *ignore_case {
                    let p = Self::bind(params, Value::String(pattern.to_uppercase()));
                    Ok(format!("UPPER({f}) like {p}"))
                } else {
                    let p = Self::bind(params, Value::String(pattern.clone()));
                    Ok(format!("{f} like {p}"))
                }
            }
            Predicate::StartsWith { path, prefix: lit, ignore_case } => {
                let f = self.field(path, prefix)?;
                let (f, lit) = Self::case_fold(f, lit, *ignore_case);
                let p = Self::bind(params, Value::String(lit));
                Ok(format!("{f} like ({p}||\"%\")"))
            }
            Predicate::EndsWith { path, suffix, ignore_case } => {
                let f = self.field(path, prefix)?;
                let (f, suffix) = Self::case_fold(f, suffix, *ignore_case);
                let p = Self::bind(params, Value::String(suffix));
                Ok(format!("{f} like (\"%\"||{p})"))
            }
            Predicate::ContainsStr { path, needle, ignore_case } => {
                let f = self.field(path, prefix)?;
                let (f, needle) = Self::case_fold(f, needle, *ignore_case);
                let p = Self::bind(params, Value::String(needle));
                Ok(format!("contains({f}, {p})"))
            }
            Predicate::Matches { path, pattern } => {
                let f = self.field(path, prefix)?;
                // validate the pattern here so a bad regex fails the compile,
                // not the backend call
                regex::Regex::new(pattern)
                    .map_err(|e| Error::MalformedExpression(format!("invalid regex: {e}")))?;
                let p = Self::bind(params, Value::String(pattern.clone()));
                Ok(format!("regexp_like({f}, {p})"))
            }
            Predicate::Between { path, low, high } => {
                let f = self.field(path, prefix)?;
                let p_low = Self::bind(params, low.clone());
                let p_high = Self::bind(params, high.clone());
                Ok(format!("{f} between {p_low} and {p_high}"))
            }
            Predicate::In { path, values } => self.serialize_in(path, values, prefix, params),
            Predicate::NotIn { path, values } => {
                // single element degrades to a plain inequality
                if values.len() == 1 {
                    let f = self.field(path, prefix)?;
                    let p = Self::bind(params, values[0].clone());
                    return Ok(format!("{f} != {p}"));
                }
                let inner = self.serialize_in(path, values, prefix, params)?;
                Ok(format!("not( ({inner}) )"))
            }
            Predicate::IsNull(path) => {
                let f = self.field(path, prefix)?;
                Ok(format!("{f} is null"))
            }
            Predicate::IsNotNull(path) => {
                let f = self.field(path, prefix)?;
                Ok(format!("{f} is not null"))
            }
            Predicate::Exists(path) => {
                let f = self.field(path, prefix)?;
                Ok(format!("{f} is not missing"))
            }
            Predicate::IsEmpty(path) => {
                // empty string composed with stored null
                let desugared = Predicate::Or(vec![
                    Predicate::Eq { path: path.clone(), value: Value::String(String::new()) },
                    Predicate::IsNull(path.clone()),
                ]);
                self.serialize(&desugared, prefix, params)
            }
            Predicate::LengthEq { path, len } => {
                let f = self.field(path, prefix)?;
                let p = Self::bind(params, Value::from(*len));
                Ok(format!("LENGTH({f}) = {p}"))
            }
            Predicate::ElemMatch { path, conditions } => {
                if !QueryOp::ElemMatch.is_supported() {
                    return Err(Error::UnsupportedOperator(QueryOp::ElemMatch.name()));
                }
                if conditions.is_empty() {
                    return Err(Error::MalformedExpression(
                        "elem_match requires at least one condition".into(),
                    ));
                }
                let f = self.field(path, prefix)?;
                let inner = if conditions.len() == 1 {
                    self.serialize(&conditions[0], Some("x"), params)?
                } else {
                    self.serialize_joined(conditions, "and", Some("x"), params)?
                };
                Ok(format!("any x in {f} satisfies {inner} end"))
            }
            Predicate::NoMatch => {
                if !QueryOp::NoMatch.is_supported() {
                    return Err(Error::UnsupportedOperator(QueryOp::NoMatch.name()));
                }
                Ok("1 = 0".into())
            }
            Predicate::Geo { op, .. } => {
                // no N1QL emission template is registered for the geo family
                if op.is_supported() {
                    return Err(Error::MalformedExpression(format!(
                        "operator {} is not a geo operator",
                        op.name()
                    )));
                }
                Err(Error::UnsupportedOperator(op.name()))
            }
            Predicate::Not(inner) => {
                let body = self.serialize(inner, prefix, params)?;
                Ok(format!("not( ({body}) )"))
            }
            Predicate::And(predicates) => {
                if predicates.is_empty() {
                    return Ok("true".into());
                }
                if predicates.len() == 1 {
                    return self.serialize(&predicates[0], prefix, params);
                }
                self.serialize_joined(predicates, "and", prefix, params)
            }
            Predicate::Or(predicates) => {
                if predicates.is_empty() {
                    return Ok("false".into());
                }
                if predicates.len() == 1 {
                    return self.serialize(&predicates[0], prefix, params);
                }
                self.serialize_joined(predicates, "or", prefix, params)
            }
        }
    }

    fn serialize_in(
        &self,
        path: &FieldPath,
        values: &[Value],
        prefix: Option<&str>,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        let f = self.field(path, prefix)?;
        match values.len() {
            // an empty membership set can never match
            0 => Ok("1 = 0".into()),
            // single element degrades to a plain equality
            1 => {
                let p = Self::bind(params, values[0].clone());
                Ok(format!("{f} = {p}"))
            }
            _ => {
                let p = Self::bind(params, Value::Array(values.to_vec()));
                Ok(format!("{f} in {p}"))
            }
        }
    }

    fn serialize_joined(
        &self,
        predicates: &[Predicate],
        keyword: &str,
        prefix: Option<&str>,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        let mut out = String::new();
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                out.push_str(&format!(" {keyword} "));
            }
            out.push_str("  (");
            out.push_str(&self.serialize(predicate, prefix, params)?);
            out.push(')');
        }
        Ok(out)
    }

    fn case_fold(field: String, literal: &str, ignore_case: bool) -> (String, String) {
        if ignore_case {
            (format!("UPPER({field})"), literal.to_uppercase())
        } else {
            (field, literal.to_string())
        }
    }
}
