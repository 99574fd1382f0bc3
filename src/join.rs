//! Semi-join emulation. The backend has no relational join, so a declared
//! join is executed as two round trips: first the on-clause predicate runs
//! against the target collection projecting the distinct key field, then the
//! resulting key set folds back into the primary filter as a membership
//! condition on the source path. An empty key set folds a guaranteed-false
//! filter, never an unfiltered query.

use std::collections::BTreeMap;

use crate::{
    error::Result,
    path::FieldPath,
    predicate::Predicate,
    query::{DocumentQuery, QuerySpec},
    serializer::N1qlSerializer,
    template::{DocumentTemplate, ScanConsistency},
};

/// One declared join: consumed during filter creation, never persisted past a
/// single query build.
#[derive(Clone, Debug)]
pub(crate) struct JoinClause {
    pub(crate) collection: String,
    pub(crate) source: FieldPath,
    pub(crate) target: FieldPath,
    pub(crate) on: Predicate,
}

/// Builder returned by [`DocumentQuery::join`]; the join is inert until its
/// on-clause is supplied.
pub struct JoinBuilder<T> {
    query: DocumentQuery<T>,
    collection: String,
    source: FieldPath,
    target: FieldPath,
}

impl<T> JoinBuilder<T> {
    pub(crate) fn new(
        query: DocumentQuery<T>,
        collection: String,
        source: FieldPath,
        target: FieldPath,
    ) -> Self {
        Self { query, collection, source, target }
    }

    pub fn on(mut self, condition: Predicate) -> DocumentQuery<T> {
        self.query.push_join(JoinClause {
            collection: self.collection,
            source: self.source,
            target: self.target,
            on: condition,
        });
        self.query
    }
}

/// Builder returned by [`DocumentQuery::any_embedded`]: element match over an
/// embedded collection field.
pub struct AnyEmbeddedBuilder<T> {
    query: DocumentQuery<T>,
    path: FieldPath,
}

impl<T> AnyEmbeddedBuilder<T> {
    pub(crate) fn new(query: DocumentQuery<T>, path: FieldPath) -> Self {
        Self { query, path }
    }

    pub fn on(mut self, conditions: Vec<Predicate>) -> DocumentQuery<T> {
        self.query.push_filter(Predicate::ElemMatch { path: self.path, conditions });
        self.query
    }
}

/// Runs the sub-query eagerly and returns the predicate to fold into the
/// primary filter. Sub-query errors propagate; they are never treated as "no
/// matches".
pub(crate) async fn resolve_join(
    template: &dyn DocumentTemplate,
    serializer: &N1qlSerializer,
    consistency: ScanConsistency,
    clause: &JoinClause,
) -> Result<Predicate> {
    let compiled = serializer.compile(&clause.on)?;
    let sub = QuerySpec::new(
        clause.collection.clone(),
        Some(clause.on.clone()),
        compiled,
        BTreeMap::new(),
        Vec::new(),
        None,
        None,
        consistency,
    );

    let keys = template.find_distinct(&sub, &clause.target.render()).await?;
    tracing::debug!(
        target: "quaydsl::join",
        collection = %clause.collection,
        key_field = %clause.target,
        keys = keys.len(),
        "resolved join sub-query"
    );

    if keys.is_empty() {
        Ok(Predicate::NoMatch)
    } else {
        Ok(Predicate::In { path: clause.source.clone(), values: keys })
    }
}
