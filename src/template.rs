use async_trait::async_trait;
use serde_json::Value;

use crate::{error::Error, query::QuerySpec, Result};

/// Read-your-writes vs. eventual consistency, passed through to the backend
/// untouched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScanConsistency {
    #[default]
    NotBounded,
    RequestPlus,
}

/// The document-access surface the query layer executes against.
///
/// Implementations own connection management, durability and the wire
/// protocol. The "no results" condition must be reported as
/// [`Error::NoResults`] so the fetch layer can map it to an empty outcome;
/// every other failure should use a distinct variant.
#[async_trait]
pub trait DocumentTemplate: Send + Sync {
    /// Runs the query and returns the matching documents, window and sort
    /// applied.
    async fn find(&self, query: &QuerySpec) -> Result<Vec<Value>>;

    /// Returns the number of documents matching the query.
    async fn count(&self, query: &QuerySpec) -> Result<u64>;

    /// Returns the distinct values of `field` across documents matching the
    /// query, skipping documents where the field is missing.
    async fn find_distinct(&self, query: &QuerySpec, field: &str) -> Result<Vec<Value>>;

    /// Opens a forward-only cursor over the query results.
    async fn open_stream(&self, query: &QuerySpec) -> Result<Box<dyn FetchCursor>>;

    async fn insert(&self, collection: &str, document: Value) -> Result<()>;

    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    async fn remove(&self, collection: &str, id: &str) -> Result<()>;
}

/// A forward-only cursor over raw documents. Implementations must release
/// backend resources in [`FetchCursor::close`] and on drop.
#[async_trait]
pub trait FetchCursor: Send {
    async fn try_next(&mut self) -> Result<Option<Value>>;

    async fn close(&mut self) -> Result<()>;
}

/// Hook for mapping backend execution errors to domain-specific ones before
/// they surface to the caller. Compile errors and the no-results signal never
/// pass through here.
pub trait ErrorTranslator: Send + Sync {
    fn translate(&self, err: Error) -> Error;
}

/// Default translator: passes errors through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTranslator;

impl ErrorTranslator for NoopTranslator {
    fn translate(&self, err: Error) -> Error {
        err
    }
}
