use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Document, DocumentStore, Filter, StoreTransaction};
use crate::error::{conflict_error, store_error, Error};

type Key = (&'static str, Uuid);

#[derive(Clone, Debug)]
struct Entry {
    // insertion order, used to keep listings stable
    seq: u64,
    version: u64,
    data: Value,
}

#[derive(Clone, Debug)]
enum Write {
    Insert {
        collection: &'static str,
        id: Uuid,
        data: Value,
        unique: &'static [&'static str],
    },
    Update {
        collection: &'static str,
        id: Uuid,
        data: Value,
        unique: &'static [&'static str],
    },
    Remove {
        collection: &'static str,
        id: Uuid,
    },
}

#[derive(Default)]
struct State {
    collections: HashMap<&'static str, HashMap<Uuid, Entry>>,
    clock: u64,
    failing: HashSet<&'static str>,
    interleaving: bool,
}

impl State {
    fn version_of(&self, (collection, id): &Key) -> Option<u64> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|entry| entry.version)
    }

    fn check_writable(&self, collection: &'static str) -> Result<(), Error> {
        if self.failing.contains(collection) {
            return Err(store_error(format!(
                "write to {} rejected by the store",
                collection
            )));
        }

        Ok(())
    }

    fn documents(&self, collection: &'static str, filter: &Filter) -> Vec<Value> {
        let mut entries: Vec<&Entry> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|e| filter.matches(&e.data))
                    .collect()
            })
            .unwrap_or_default();

        entries.sort_by_key(|entry| entry.seq);
        entries
            .into_iter()
            .map(|entry| entry.data.clone())
            .collect()
    }

    /// Applies writes all-or-nothing.
    fn apply(&mut self, writes: Vec<Write>) -> Result<(), Error> {
        let mut collections = self.collections.clone();
        let mut clock = self.clock;

        for write in writes {
            clock += 1;

            match write {
                Write::Insert {
                    collection,
                    id,
                    data,
                    unique,
                } => {
                    let docs = collections.entry(collection).or_default();

                    if docs.contains_key(&id) {
                        return Err(store_error(format!(
                            "document {} already exists in {}",
                            id, collection
                        )));
                    }
                    ensure_unique(docs, &id, &data, unique)?;

                    docs.insert(
                        id,
                        Entry {
                            seq: clock,
                            version: clock,
                            data,
                        },
                    );
                }
                Write::Update {
                    collection,
                    id,
                    data,
                    unique,
                } => {
                    let docs = collections.entry(collection).or_default();
                    ensure_unique(docs, &id, &data, unique)?;

                    let entry = docs.get_mut(&id).ok_or_else(|| {
                        store_error(format!(
                            "no document {} in {} to update",
                            id, collection
                        ))
                    })?;
                    entry.version = clock;
                    entry.data = data;
                }
                Write::Remove { collection, id } => {
                    collections
                        .get_mut(collection)
                        .and_then(|docs| docs.remove(&id))
                        .ok_or_else(|| {
                            store_error(format!(
                                "no document {} in {} to remove",
                                id, collection
                            ))
                        })?;
                }
            }
        }

        self.collections = collections;
        self.clock = clock;

        Ok(())
    }
}

fn ensure_unique(
    docs: &HashMap<Uuid, Entry>,
    id: &Uuid,
    data: &Value,
    unique: &[&str],
) -> Result<(), Error> {
    for field in unique {
        let value = match data.get(*field) {
            Some(value) => value,
            None => continue,
        };

        let taken = docs
            .iter()
            .any(|(other, entry)| other != id && entry.data.get(*field) == Some(value));

        if taken {
            return Err(conflict_error());
        }
    }

    Ok(())
}

/// In-process document store. Transactions buffer their writes and apply them
/// at commit, aborting on any concurrent change to a document they touched.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

pub struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    observed: HashMap<Key, Option<u64>>,
    writes: Vec<Write>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent write to `collection` fails with a store error.
    pub async fn fail_writes_to(&self, collection: &'static str) {
        self.state.lock().await.failing.insert(collection);
    }

    pub async fn restore_writes_to(&self, collection: &'static str) {
        self.state.lock().await.failing.remove(collection);
    }

    /// Commits yield to the scheduler before validating, so transactions
    /// driven concurrently from one task overlap instead of running back to back.
    pub async fn interleave_commits(&self) {
        self.state.lock().await.interleaving = true;
    }

    pub async fn count(&self, collection: &'static str) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .map_or(0, |docs| docs.len())
    }

    async fn write(&self, write: Write, collection: &'static str) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.check_writable(collection)?;
        state.apply(vec![write])
    }
}

fn decode<D: Document>(data: Value) -> Result<D, Error> {
    Ok(serde_json::from_value(data)?)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn find_by_id<D: Document>(&self, id: &Uuid) -> Result<Option<D>, Error> {
        let state = self.state.lock().await;

        state
            .collections
            .get(D::COLLECTION)
            .and_then(|docs| docs.get(id))
            .map(|entry| decode(entry.data.clone()))
            .transpose()
    }

    async fn find_by_ids<D: Document>(&self, ids: &[Uuid]) -> Result<Vec<D>, Error> {
        let state = self.state.lock().await;
        let docs = match state.collections.get(D::COLLECTION) {
            Some(docs) => docs,
            None => return Ok(vec![]),
        };

        ids.iter()
            .filter_map(|id| docs.get(id))
            .map(|entry| decode(entry.data.clone()))
            .collect()
    }

    async fn find_one<D: Document>(&self, filter: Filter) -> Result<Option<D>, Error> {
        let state = self.state.lock().await;

        state
            .documents(D::COLLECTION, &filter)
            .into_iter()
            .next()
            .map(decode)
            .transpose()
    }

    async fn find<D: Document>(&self, filter: Filter) -> Result<Vec<D>, Error> {
        let state = self.state.lock().await;

        state
            .documents(D::COLLECTION, &filter)
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn insert<D: Document>(&self, doc: &D) -> Result<(), Error> {
        let write = Write::Insert {
            collection: D::COLLECTION,
            id: doc.id(),
            data: serde_json::to_value(doc)?,
            unique: D::UNIQUE_FIELDS,
        };

        self.write(write, D::COLLECTION).await
    }

    async fn update<D: Document>(&self, doc: &D) -> Result<(), Error> {
        let write = Write::Update {
            collection: D::COLLECTION,
            id: doc.id(),
            data: serde_json::to_value(doc)?,
            unique: D::UNIQUE_FIELDS,
        };

        self.write(write, D::COLLECTION).await
    }

    async fn remove<D: Document>(&self, id: &Uuid) -> Result<(), Error> {
        let write = Write::Remove {
            collection: D::COLLECTION,
            id: *id,
        };

        self.write(write, D::COLLECTION).await
    }

    async fn begin(&self) -> Result<Self::Tx, Error> {
        Ok(MemoryTransaction {
            state: self.state.clone(),
            observed: HashMap::new(),
            writes: vec![],
        })
    }
}

impl MemoryTransaction {
    // remembers the first version seen for a key; that is what commit checks against
    async fn observe(&mut self, key: Key) {
        if self.observed.contains_key(&key) {
            return;
        }

        let version = self.state.lock().await.version_of(&key);
        self.observed.insert(key, version);
    }

    // latest buffered value for a key: Some(None) when this transaction removed it
    fn staged(&self, collection: &'static str, id: &Uuid) -> Option<Option<&Value>> {
        self.writes.iter().rev().find_map(|write| match write {
            Write::Insert {
                collection: c,
                id: i,
                data,
                ..
            }
            | Write::Update {
                collection: c,
                id: i,
                data,
                ..
            } if *c == collection && i == id => Some(Some(data)),
            Write::Remove {
                collection: c,
                id: i,
            } if *c == collection && i == id => Some(None),
            _ => None,
        })
    }

    async fn stage(&mut self, write: Write, collection: &'static str) -> Result<(), Error> {
        self.state.lock().await.check_writable(collection)?;
        self.writes.push(write);

        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_by_id_for_update<D: Document>(
        &mut self,
        id: &Uuid,
    ) -> Result<Option<D>, Error> {
        if let Some(staged) = self.staged(D::COLLECTION, id) {
            return staged.cloned().map(decode).transpose();
        }

        let state = self.state.lock().await;
        let entry = state
            .collections
            .get(D::COLLECTION)
            .and_then(|docs| docs.get(id));

        self.observed
            .entry((D::COLLECTION, *id))
            .or_insert_with(|| entry.map(|entry| entry.version));

        entry.map(|entry| decode(entry.data.clone())).transpose()
    }

    async fn insert<D: Document>(&mut self, doc: &D) -> Result<(), Error> {
        let write = Write::Insert {
            collection: D::COLLECTION,
            id: doc.id(),
            data: serde_json::to_value(doc)?,
            unique: D::UNIQUE_FIELDS,
        };

        self.stage(write, D::COLLECTION).await
    }

    async fn update<D: Document>(&mut self, doc: &D) -> Result<(), Error> {
        self.observe((D::COLLECTION, doc.id())).await;

        let write = Write::Update {
            collection: D::COLLECTION,
            id: doc.id(),
            data: serde_json::to_value(doc)?,
            unique: D::UNIQUE_FIELDS,
        };

        self.stage(write, D::COLLECTION).await
    }

    async fn remove<D: Document>(&mut self, id: &Uuid) -> Result<(), Error> {
        self.observe((D::COLLECTION, *id)).await;

        let write = Write::Remove {
            collection: D::COLLECTION,
            id: *id,
        };

        self.stage(write, D::COLLECTION).await
    }

    async fn commit(self) -> Result<(), Error> {
        let interleaving = self.state.lock().await.interleaving;
        if interleaving {
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock().await;

        for (key, version) in self.observed.iter() {
            if state.version_of(key) != *version {
                tracing::warn!("write conflict on {}/{}", key.0, key.1);
                return Err(store_error("write conflict, transaction aborted"));
            }
        }

        state.apply(self.writes)
    }

    async fn abort(self) -> Result<(), Error> {
        Ok(())
    }
}
