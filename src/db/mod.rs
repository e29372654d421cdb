mod memory;
mod postgres;

pub use memory::{MemoryStore, MemoryTransaction};
pub use postgres::{PgStore, PgTransaction};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;

/// A typed document living in a named collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    /// Top-level fields whose values must be unique across the collection.
    const UNIQUE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> Uuid;
}

/// Store-level query predicate over top-level document fields.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    All,
    Eq(&'static str, Value),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq(field, value) => data.get(field) == Some(value),
        }
    }
}

/// Writes performed through a transaction only become visible once it commits.
/// `commit` and `abort` consume the handle; dropping it uncommitted aborts.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_by_id_for_update<D: Document>(&mut self, id: &Uuid)
        -> Result<Option<D>, Error>;

    async fn insert<D: Document>(&mut self, doc: &D) -> Result<(), Error>;

    async fn update<D: Document>(&mut self, doc: &D) -> Result<(), Error>;

    async fn remove<D: Document>(&mut self, id: &Uuid) -> Result<(), Error>;

    async fn commit(self) -> Result<(), Error>;

    async fn abort(self) -> Result<(), Error>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    type Tx: StoreTransaction;

    async fn find_by_id<D: Document>(&self, id: &Uuid) -> Result<Option<D>, Error>;

    /// Documents in the order of `ids`; ids with no document are skipped.
    async fn find_by_ids<D: Document>(&self, ids: &[Uuid]) -> Result<Vec<D>, Error>;

    async fn find_one<D: Document>(&self, filter: Filter) -> Result<Option<D>, Error>;

    async fn find<D: Document>(&self, filter: Filter) -> Result<Vec<D>, Error>;

    async fn insert<D: Document>(&self, doc: &D) -> Result<(), Error>;

    async fn update<D: Document>(&self, doc: &D) -> Result<(), Error>;

    async fn remove<D: Document>(&self, id: &Uuid) -> Result<(), Error>;

    async fn begin(&self) -> Result<Self::Tx, Error>;

    /// Runs `f` inside a transaction: commits when it returns `Ok`, aborts and
    /// hands back its error otherwise.
    async fn with_transaction<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: for<'tx> FnOnce(&'tx mut Self::Tx) -> BoxFuture<'tx, Result<T, Error>> + Send + 'static,
    {
        let mut tx = self.begin().await?;

        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tracing::info!("aborting transaction: {}", err);

                if let Err(abort_err) = tx.abort().await {
                    tracing::warn!("transaction abort failed: {}", abort_err);
                }

                Err(err)
            }
        }
    }
}

#[test]
fn filter_matches_top_level_fields_only() {
    let doc = serde_json::json!({ "email": "a@b.com", "nested": { "email": "x@y.com" } });

    assert!(Filter::All.matches(&doc));
    assert!(Filter::eq("email", "a@b.com").matches(&doc));
    assert!(!Filter::eq("email", "A@b.com").matches(&doc));
    assert!(!Filter::eq("missing", "a@b.com").matches(&doc));
}
