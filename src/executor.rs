use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{Error, Result},
    page::{Page, PageRequest},
    query::QuerySpec,
    serializer::N1qlSerializer,
    template::{DocumentTemplate, ErrorTranslator, FetchCursor},
};

const SLOW_QUERY: Duration = Duration::from_millis(500);

/// An assembled query bound to its template, ready to execute in one of the
/// fetch modes. The spec is consumed by exactly one fetch call.
///
/// A backend "no results" error is converted to the empty outcome of the
/// respective mode; every other execution error passes through the
/// [`ErrorTranslator`] and surfaces to the caller.
pub struct BoundQuery<T> {
    template: Arc<dyn DocumentTemplate>,
    translator: Arc<dyn ErrorTranslator>,
    spec: QuerySpec,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for BoundQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundQuery").field("spec", &self.spec).finish_non_exhaustive()
    }
}

impl<T> BoundQuery<T> {
    pub(crate) fn new(
        template: Arc<dyn DocumentTemplate>,
        translator: Arc<dyn ErrorTranslator>,
        spec: QuerySpec,
    ) -> Self {
        Self { template, translator, spec, _marker: PhantomData }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    fn recover<D>(&self, err: Error, default: D) -> Result<D> {
        if err.is_no_results() {
            Ok(default)
        } else {
            Err(self.translator.translate(err))
        }
    }

    fn log_slow(&self, started: Instant) {
        if started.elapsed() > SLOW_QUERY {
            tracing::warn!(
                target: "quaydsl::slow_query",
                elapsed_ms = started.elapsed().as_millis() as u64,
                query = %self.spec,
                "slow document query"
            );
        }
    }
}

impl<T: DeserializeOwned> BoundQuery<T> {
    /// All matches, materialized in order.
    pub async fn fetch_all(self) -> Result<Vec<T>> {
        let started = Instant::now();
        let rows = match self.template.find(&self.spec).await {
            Ok(rows) => rows,
            Err(e) => return self.recover(e, Vec::new()),
        };
        self.log_slow(started);
        rows.into_iter().map(decode).collect()
    }

    /// At most one match; more than one row is a cardinality violation.
    pub async fn fetch_one(self) -> Result<Option<T>> {
        let rows = match self.template.find(&self.spec).await {
            Ok(rows) => rows,
            Err(e) => return self.recover(e, None),
        };
        if rows.len() > 1 {
            return Err(Error::TooManyResults { found: rows.len() });
        }
        rows.into_iter().next().map(decode).transpose()
    }

    /// First match, if any. Bounds the query to a single row.
    pub async fn fetch_first(self) -> Result<Option<T>> {
        let offset = self.spec.offset();
        let spec = self.spec.clone().with_window(Some(1), offset);
        let rows = match self.template.find(&spec).await {
            Ok(rows) => rows,
            Err(e) => return self.recover(e, None),
        };
        rows.into_iter().next().map(decode).transpose()
    }

    /// Scalar count with limit/offset forced back to unset.
    pub async fn fetch_count(self) -> Result<u64> {
        let spec = self.spec.unbounded();
        match self.template.count(&spec).await {
            Ok(total) => Ok(total),
            Err(e) => self.recover(e, 0),
        }
    }

    /// One page of content plus the total count. The windowed content query
    /// and the unbounded count query are independent and run concurrently;
    /// both complete before the page is returned.
    pub async fn fetch_page(self, request: PageRequest) -> Result<Page<T>> {
        let mut content_spec = self.spec.clone();
        if !request.sort.is_empty() {
            content_spec.push_sort(N1qlSerializer::new().compile_sort(&request.sort)?);
        }
        let content_spec =
            content_spec.with_window(Some(request.size as i64), Some(request.offset() as i64));
        let count_spec = self.spec.unbounded();

        let started = Instant::now();
        let content_fut = async {
            match self.template.find(&content_spec).await {
                Ok(rows) => Ok(rows),
                Err(e) => self.recover(e, Vec::new()),
            }
        };
        let count_fut = async {
            match self.template.count(&count_spec).await {
                Ok(total) => Ok(total),
                Err(e) => self.recover(e, 0),
            }
        };
        let (rows, total) = futures::future::try_join(content_fut, count_fut).await?;
        self.log_slow(started);

        let content = rows.into_iter().map(decode).collect::<Result<Vec<T>>>()?;
        Ok(Page { content, total, page: request.page, size: request.size })
    }

    /// Lazy, forward-only stream over the matches. The stream must be closed
    /// (or dropped) to release the backend cursor.
    pub async fn fetch_stream(self) -> Result<DocStream<T>> {
        match self.template.open_stream(&self.spec).await {
            Ok(cursor) => Ok(DocStream::new(Some(cursor))),
            Err(e) if e.is_no_results() => Ok(DocStream::new(None)),
            Err(e) => Err(self.translator.translate(e)),
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(Error::from)
}

/// A lazy, closable sequence of decoded documents.
///
/// Single-reader, forward-only. [`DocStream::close`] releases the backend
/// cursor; reading after close fails with [`Error::StreamClosed`]. Dropping
/// the stream drops the cursor, which releases resources on every exit path.
pub struct DocStream<T> {
    cursor: Option<Box<dyn FetchCursor>>,
    closed: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> DocStream<T> {
    fn new(cursor: Option<Box<dyn FetchCursor>>) -> Self {
        Self { cursor, closed: false, _marker: PhantomData }
    }

    /// Next decoded document, or `None` once exhausted.
    pub async fn try_next(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Err(Error::StreamClosed);
        }
        match &mut self.cursor {
            Some(cursor) => match cursor.try_next().await? {
                Some(value) => Ok(Some(decode(value)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Releases the backend cursor. Further reads fail with
    /// [`Error::StreamClosed`].
    pub async fn close(&mut self) -> Result<()> {
        self.closed = true;
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close().await?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
