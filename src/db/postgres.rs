use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, types::Json, Executor, Pool, Postgres, Row, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Document, DocumentStore, Filter, StoreTransaction};
use crate::{
    entities::{Place, User},
    error::{conflict_error, database_error, store_error, Error},
};

type Database = Postgres;

/// Each collection is a table of `(id UUID, data JSONB)` rows.
pub struct PgStore {
    pool: Pool<Database>,
}

pub struct PgTransaction {
    tx: Transaction<'static, Database>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::connect", skip(db_uri))]
    pub async fn connect(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        let store = Self { pool };

        store.ensure_collection::<Place>().await?;
        store.ensure_collection::<User>().await?;

        Ok(store)
    }

    async fn ensure_collection<D: Document>(&self) -> Result<(), Error> {
        self.pool
            .execute(
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, data JSONB NOT NULL)",
                    D::COLLECTION
                )
                .as_str(),
            )
            .await?;

        for field in D::UNIQUE_FIELDS {
            self.pool
                .execute(
                    format!(
                        "CREATE UNIQUE INDEX IF NOT EXISTS {0}_{1}_key ON {0} ((data->>'{1}'))",
                        D::COLLECTION,
                        field
                    )
                    .as_str(),
                )
                .await?;
        }

        tracing::info!("collection {} ready", D::COLLECTION);

        Ok(())
    }
}

fn containing(field: &str, value: Value) -> Json<Value> {
    let mut object = Map::new();
    object.insert(field.to_string(), value);

    Json(Value::Object(object))
}

fn decode<D: Document>(row: sqlx::postgres::PgRow) -> Result<D, Error> {
    let Json(doc): Json<D> = row.try_get("data")?;

    Ok(doc)
}

// unique index violations surface as conflicts, anything else as a store failure
fn write_error<D: Document>(err: sqlx::Error) -> Error {
    if let Some(db_err) = err.as_database_error() {
        let is_unique_violation = db_err.code().as_deref() == Some("23505");
        let on_unique_field = db_err.constraint().map_or(false, |name| {
            D::UNIQUE_FIELDS
                .iter()
                .any(|field| name == format!("{}_{}_key", D::COLLECTION, field))
        });

        if is_unique_violation && on_unique_field {
            return conflict_error();
        }
    }

    database_error(err)
}

async fn select_by_id<'e, D, E>(executor: E, id: &Uuid, lock: bool) -> Result<Option<D>, Error>
where
    D: Document,
    E: Executor<'e, Database = Database>,
{
    let sql = format!(
        "SELECT data FROM {} WHERE id = $1{}",
        D::COLLECTION,
        if lock { " FOR UPDATE" } else { "" }
    );

    let maybe_row = executor.fetch_optional(sqlx::query(&sql).bind(id)).await?;

    maybe_row.map(decode).transpose()
}

async fn insert_document<'e, D, E>(executor: E, doc: &D) -> Result<(), Error>
where
    D: Document,
    E: Executor<'e, Database = Database>,
{
    let sql = format!("INSERT INTO {} (id, data) VALUES ($1, $2)", D::COLLECTION);

    executor
        .execute(sqlx::query(&sql).bind(doc.id()).bind(Json(doc)))
        .await
        .map_err(write_error::<D>)?;

    Ok(())
}

async fn update_document<'e, D, E>(executor: E, doc: &D) -> Result<(), Error>
where
    D: Document,
    E: Executor<'e, Database = Database>,
{
    let sql = format!("UPDATE {} SET data = $2 WHERE id = $1", D::COLLECTION);

    let result = executor
        .execute(sqlx::query(&sql).bind(doc.id()).bind(Json(doc)))
        .await
        .map_err(write_error::<D>)?;

    if result.rows_affected() == 0 {
        return Err(store_error(format!(
            "no document {} in {} to update",
            doc.id(),
            D::COLLECTION
        )));
    }

    Ok(())
}

async fn delete_document<'e, D, E>(executor: E, id: &Uuid) -> Result<(), Error>
where
    D: Document,
    E: Executor<'e, Database = Database>,
{
    let sql = format!("DELETE FROM {} WHERE id = $1", D::COLLECTION);

    let result = executor.execute(sqlx::query(&sql).bind(id)).await?;

    if result.rows_affected() == 0 {
        return Err(store_error(format!(
            "no document {} in {} to remove",
            id,
            D::COLLECTION
        )));
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for PgStore {
    type Tx = PgTransaction;

    #[tracing::instrument(skip(self))]
    async fn find_by_id<D: Document>(&self, id: &Uuid) -> Result<Option<D>, Error> {
        select_by_id(&self.pool, id, false).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_ids<D: Document>(&self, ids: &[Uuid]) -> Result<Vec<D>, Error> {
        let sql = format!("SELECT data FROM {} WHERE id = ANY($1)", D::COLLECTION);

        let rows = self.pool.fetch_all(sqlx::query(&sql).bind(ids)).await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in rows {
            let doc: D = decode(row)?;
            by_id.insert(doc.id(), doc);
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn find_one<D: Document>(&self, filter: Filter) -> Result<Option<D>, Error> {
        let maybe_row = match filter {
            Filter::All => {
                let sql = format!("SELECT data FROM {} LIMIT 1", D::COLLECTION);
                self.pool.fetch_optional(sqlx::query(&sql)).await?
            }
            Filter::Eq(field, value) => {
                let sql = format!(
                    "SELECT data FROM {} WHERE data @> $1 LIMIT 1",
                    D::COLLECTION
                );
                self.pool
                    .fetch_optional(sqlx::query(&sql).bind(containing(field, value)))
                    .await?
            }
        };

        maybe_row.map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn find<D: Document>(&self, filter: Filter) -> Result<Vec<D>, Error> {
        let rows = match filter {
            Filter::All => {
                let sql = format!("SELECT data FROM {}", D::COLLECTION);
                self.pool.fetch_all(sqlx::query(&sql)).await?
            }
            Filter::Eq(field, value) => {
                let sql = format!("SELECT data FROM {} WHERE data @> $1", D::COLLECTION);
                self.pool
                    .fetch_all(sqlx::query(&sql).bind(containing(field, value)))
                    .await?
            }
        };

        rows.into_iter().map(decode).collect()
    }

    #[tracing::instrument(skip_all)]
    async fn insert<D: Document>(&self, doc: &D) -> Result<(), Error> {
        insert_document(&self.pool, doc).await
    }

    #[tracing::instrument(skip_all)]
    async fn update<D: Document>(&self, doc: &D) -> Result<(), Error> {
        update_document(&self.pool, doc).await
    }

    #[tracing::instrument(skip(self))]
    async fn remove<D: Document>(&self, id: &Uuid) -> Result<(), Error> {
        delete_document::<D, _>(&self.pool, id).await
    }

    async fn begin(&self) -> Result<Self::Tx, Error> {
        let tx = self.pool.begin().await?;

        Ok(PgTransaction { tx })
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    #[tracing::instrument(skip(self))]
    async fn find_by_id_for_update<D: Document>(
        &mut self,
        id: &Uuid,
    ) -> Result<Option<D>, Error> {
        select_by_id(&mut *self.tx, id, true).await
    }

    async fn insert<D: Document>(&mut self, doc: &D) -> Result<(), Error> {
        insert_document(&mut *self.tx, doc).await
    }

    async fn update<D: Document>(&mut self, doc: &D) -> Result<(), Error> {
        update_document(&mut *self.tx, doc).await
    }

    async fn remove<D: Document>(&mut self, id: &Uuid) -> Result<(), Error> {
        delete_document::<D, _>(&mut *self.tx, id).await
    }

    async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await?;

        Ok(())
    }

    async fn abort(self) -> Result<(), Error> {
        self.tx.rollback().await?;

        Ok(())
    }
}
