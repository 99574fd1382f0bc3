use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    error::Result,
    executor::BoundQuery,
    join::{resolve_join, AnyEmbeddedBuilder, JoinBuilder, JoinClause},
    path::FieldPath,
    predicate::Predicate,
    serializer::{CompiledFilter, N1qlSerializer, OrderSpecifier, Projection, SortDirection},
    template::{DocumentTemplate, ErrorTranslator, NoopTranslator, ScanConsistency},
};

/// A fully assembled, immutable query: compiled filter, projection, sort and
/// window. Built once per invocation and consumed by the executor; unset
/// limit/offset never appear in the emitted query (no "limit 0" conflation).
#[derive(Clone, Debug)]
pub struct QuerySpec {
    collection: String,
    filter: Option<Predicate>,
    compiled: CompiledFilter,
    projection: BTreeMap<String, String>,
    sort: Vec<(String, SortDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
    consistency: ScanConsistency,
}

impl QuerySpec {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        collection: String,
        filter: Option<Predicate>,
        compiled: CompiledFilter,
        projection: BTreeMap<String, String>,
        sort: Vec<(String, SortDirection)>,
        limit: Option<i64>,
        offset: Option<i64>,
        consistency: ScanConsistency,
    ) -> Self {
        Self { collection, filter, compiled, projection, sort, limit, offset, consistency }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The folded predicate tree, for backends that evaluate structurally.
    pub fn filter(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    /// The compiled ` WHERE …` clause with positional parameters.
    pub fn compiled(&self) -> &CompiledFilter {
        &self.compiled
    }

    pub fn projection(&self) -> &BTreeMap<String, String> {
        &self.projection
    }

    pub fn sort(&self) -> &[(String, SortDirection)] {
        &self.sort
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn consistency(&self) -> ScanConsistency {
        self.consistency
    }

    // The setters below exist for the customizer hook, which runs exactly
    // once between assembly and execution.

    pub fn set_consistency(&mut self, consistency: ScanConsistency) {
        self.consistency = consistency;
    }

    pub fn set_limit(&mut self, limit: Option<i64>) {
        self.limit = limit;
    }

    pub fn set_offset(&mut self, offset: Option<i64>) {
        self.offset = offset;
    }

    pub(crate) fn with_window(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Copy of the spec with limit/offset forced back to unset, for count
    /// queries.
    pub(crate) fn unbounded(&self) -> Self {
        self.clone().with_window(None, None)
    }

    pub(crate) fn push_sort(&mut self, extra: Vec<(String, SortDirection)>) {
        self.sort.extend(extra);
    }
}

impl fmt::Display for QuerySpec {
    /// Stable, human-readable export:
    /// `find(<clause>[, {alias: field, …}])[.sort(…)][.skip(n)][.limit(n)]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "find(")?;
        if self.compiled.is_empty() {
            write!(f, "{{}}")?;
        } else {
            write!(f, "{}", self.compiled.clause())?;
        }
        if !self.projection.is_empty() {
            write!(f, ", {{")?;
            for (i, (alias, field)) in self.projection.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{alias}: {field}")?;
            }
            write!(f, "}}")?;
        }
        write!(f, ")")?;
        if !self.sort.is_empty() {
            write!(f, ".sort(")?;
            for (i, (field, direction)) in self.sort.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{field}: {}", direction.as_str())?;
            }
            write!(f, ")")?;
        }
        if let Some(offset) = self.offset {
            write!(f, ".skip({offset})")?;
        }
        if let Some(limit) = self.limit {
            write!(f, ".limit({limit})")?;
        }
        Ok(())
    }
}

type Customizer = Box<dyn FnOnce(&mut QuerySpec) + Send>;

/// Fluent builder for typed document queries.
///
/// Accumulates predicates, joins, projection, sort and window, then compiles
/// everything into a [`QuerySpec`] on [`DocumentQuery::build`]. Each builder
/// owns its own state; concurrent query builds share nothing.
pub struct DocumentQuery<T> {
    template: Arc<dyn DocumentTemplate>,
    translator: Arc<dyn ErrorTranslator>,
    serializer: N1qlSerializer,
    collection: String,
    filters: Vec<Predicate>,
    joins: Vec<JoinClause>,
    projection: Projection,
    sort: Vec<OrderSpecifier>,
    limit: Option<i64>,
    offset: Option<i64>,
    consistency: ScanConsistency,
    customizer: Option<Customizer>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for DocumentQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentQuery")
            .field("collection", &self.collection)
            .field("filters", &self.filters)
            .field("joins", &self.joins.len())
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T> DocumentQuery<T> {
    pub fn new(template: Arc<dyn DocumentTemplate>, collection: impl Into<String>) -> Self {
        Self {
            template,
            translator: Arc::new(NoopTranslator),
            serializer: N1qlSerializer::new(),
            collection: collection.into(),
            filters: Vec::new(),
            joins: Vec::new(),
            projection: Projection::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            consistency: ScanConsistency::default(),
            customizer: None,
            _marker: PhantomData,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn ErrorTranslator>) -> Self {
        self.translator = translator;
        self
    }

    /// Adds a predicate; multiple calls are combined with logical and.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn filter_if(mut self, condition: bool, predicate: impl FnOnce() -> Predicate) -> Self {
        if condition {
            self.filters.push(predicate());
        }
        self
    }

    /// Declares a join against `collection`: the on-clause predicate runs
    /// there first, the distinct values of `target` fold back into this query
    /// as a membership filter on `source`.
    pub fn join(
        self,
        collection: impl Into<String>,
        source: impl Into<FieldPath>,
        target: impl Into<FieldPath>,
    ) -> JoinBuilder<T> {
        JoinBuilder::new(self, collection.into(), source.into(), target.into())
    }

    /// Element-match over an embedded collection field.
    pub fn any_embedded(self, path: impl Into<FieldPath>) -> AnyEmbeddedBuilder<T> {
        AnyEmbeddedBuilder::new(self, path.into())
    }

    pub fn select_field(mut self, alias: &str, path: &str) -> Self {
        self.projection = std::mem::take(&mut self.projection).field(alias, path);
        self
    }

    pub fn select_fields(mut self, fields: &[(&str, &str)]) -> Self {
        for (alias, path) in fields {
            self.projection = std::mem::take(&mut self.projection).field(*alias, *path);
        }
        self
    }

    pub fn order_by(mut self, path: impl Into<FieldPath>, direction: SortDirection) -> Self {
        self.sort.push(OrderSpecifier { path: path.into(), direction });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.max(0));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset.max(0));
        self
    }

    pub fn with_consistency(mut self, consistency: ScanConsistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Registers a hook that may adjust the assembled spec. Runs exactly
    /// once, after limit/offset/sort are applied, before execution.
    pub fn customize(mut self, customizer: impl FnOnce(&mut QuerySpec) + Send + 'static) -> Self {
        self.customizer = Some(Box::new(customizer));
        self
    }

    pub(crate) fn push_join(&mut self, clause: JoinClause) {
        self.joins.push(clause);
    }

    pub(crate) fn push_filter(&mut self, predicate: Predicate) {
        self.filters.push(predicate);
    }

    /// Resolves joins, compiles the filter and assembles the immutable query
    /// spec. Join sub-queries execute here, strictly before the primary
    /// query; a sub-query failure aborts the build.
    pub async fn build(mut self) -> Result<BoundQuery<T>> {
        for clause in std::mem::take(&mut self.joins) {
            let folded = resolve_join(
                self.template.as_ref(),
                &self.serializer,
                self.consistency,
                &clause,
            )
            .await?;
            self.filters.push(folded);
        }

        let filter = match self.filters.len() {
            0 => None,
            1 => Some(self.filters.remove(0)),
            _ => Some(Predicate::And(std::mem::take(&mut self.filters))),
        };

        let compiled = match &filter {
            Some(predicate) => self.serializer.compile(predicate)?,
            None => CompiledFilter::empty(),
        };
        let projection = self.serializer.compile_projection(&self.projection)?;
        let sort = self.serializer.compile_sort(&self.sort)?;

        let mut spec = QuerySpec::new(
            self.collection,
            filter,
            compiled,
            projection,
            sort,
            self.limit,
            self.offset,
            self.consistency,
        );

        if let Some(customizer) = self.customizer {
            customizer(&mut spec);
        }

        Ok(BoundQuery::new(self.template, self.translator, spec))
    }
}
