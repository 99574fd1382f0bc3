//! Quaydsl — typed predicate queries for N1QL-style document stores.
//!
//! Builds filter expressions from a predicate tree, assembles them with
//! projection, sort and pagination into one executable query, emulates joins
//! as two-step semi-joins and executes through a pluggable document template.

mod error;
pub mod executor;
pub mod join;
pub mod ops;
pub mod page;
pub mod path;
pub mod predicate;
pub mod query;
pub mod serializer;
pub mod template;
pub mod testing;

pub use error::{Error, Result, WithContext};
pub use executor::{BoundQuery, DocStream};
pub use ops::QueryOp;
pub use page::{Page, PageRequest};
pub use path::FieldPath;
pub use predicate::Predicate;
pub use query::{DocumentQuery, QuerySpec};
pub use serializer::{
    CompiledFilter, N1qlSerializer, OrderSpecifier, Projection, SortDirection,
};
pub use template::{
    DocumentTemplate, ErrorTranslator, FetchCursor, NoopTranslator, ScanConsistency,
};

pub mod prelude {
    pub use crate::{
        DocumentQuery, Error, FieldPath, PageRequest, Predicate, Result, SortDirection,
    };
}
