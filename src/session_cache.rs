//! Per-session live caches over the record store.
//!
//! A `LiveTable<T>` is an in-memory copy of some rows of one table, kept
//! current by applying change-feed events. `SessionCache` owns the live
//! tables of one UI session and is dropped with it; nothing here is global.

use std::any::Any;
use std::collections::HashMap;

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::feed::{Change, FeedError, Filter, Subscription};
use crate::models::{Record, Table};
use crate::store::RecordStore;

type Loader<T> = Box<dyn Fn(&Connection) -> Result<Vec<T>, DatabaseError> + Send>;

// ═══════════════════════════════════════════════════════════
// LiveTable — one table, one query
// ═══════════════════════════════════════════════════════════

pub struct LiveTable<T: Record> {
    rows: Vec<T>,
    subscription: Subscription<T>,
    loader: Loader<T>,
    /// Keep at most this many rows (newest first).
    limit: Option<usize>,
}

impl<T: Record> LiveTable<T> {
    /// Subscribe first, then load, so no committed change falls between the two.
    pub fn open(
        store: &RecordStore,
        filter: Option<Filter>,
        limit: Option<usize>,
        loader: impl Fn(&Connection) -> Result<Vec<T>, DatabaseError> + Send + 'static,
    ) -> Result<Self, DatabaseError> {
        let subscription = store.feed().subscribe::<T>(filter);
        let mut table = Self {
            rows: Vec::new(),
            subscription,
            loader: Box::new(loader),
            limit,
        };
        table.reload(store)?;
        Ok(table)
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn get(&self, id: &Uuid) -> Option<&T> {
        self.rows.iter().find(|row| row.id() == *id)
    }

    /// Inserts prepend, updates replace in place, deletes remove.
    /// An insert for a row already present replaces it.
    pub fn apply(&mut self, change: Change<T>) {
        match change {
            Change::Insert(row) => {
                if let Some(pos) = self.position(&row.id()) {
                    self.rows[pos] = row;
                } else {
                    self.rows.insert(0, row);
                    if let Some(limit) = self.limit {
                        self.rows.truncate(limit);
                    }
                }
            }
            Change::Update(row) => {
                if let Some(pos) = self.position(&row.id()) {
                    self.rows[pos] = row;
                }
            }
            Change::Delete { id } => self.rows.retain(|row| row.id() != id),
        }
    }

    fn position(&self, id: &Uuid) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == *id)
    }

    /// Re-run the loader, replacing every row.
    pub fn reload(&mut self, store: &RecordStore) -> Result<(), DatabaseError> {
        let mut rows = store.read(|conn| (self.loader)(conn))?;
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        self.rows = rows;
        Ok(())
    }

    /// Apply every buffered change. A lagged subscription reloads from the
    /// store instead. Returns the number of changes applied.
    pub fn sync(&mut self, store: &RecordStore) -> Result<usize, SessionCacheError> {
        let mut applied = 0;
        loop {
            match self.subscription.try_next() {
                Ok(Some(change)) => {
                    self.apply(change);
                    applied += 1;
                }
                Ok(None) => return Ok(applied),
                Err(FeedError::Lagged(missed)) => {
                    tracing::info!(table = T::TABLE.as_str(), missed, "Live table resyncing");
                    self.reload(store)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Wait for the next change and apply it.
    pub async fn next_change(&mut self) -> Result<(), FeedError> {
        let change = self.subscription.recv().await?;
        self.apply(change);
        Ok(())
    }
}

/// Type-erased view so one cache can hold tables of different row types.
trait CachedTable: Send {
    fn sync(&mut self, store: &RecordStore) -> Result<usize, SessionCacheError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Record> CachedTable for LiveTable<T> {
    fn sync(&mut self, store: &RecordStore) -> Result<usize, SessionCacheError> {
        LiveTable::sync(self, store)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ═══════════════════════════════════════════════════════════
// SessionCache — all live tables of one session
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
pub struct SessionCache {
    tables: HashMap<Table, Box<dyn CachedTable>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start caching `T`'s table. Replaces an existing watch on that table.
    pub fn watch<T: Record>(
        &mut self,
        store: &RecordStore,
        filter: Option<Filter>,
        loader: impl Fn(&Connection) -> Result<Vec<T>, DatabaseError> + Send + 'static,
    ) -> Result<(), SessionCacheError> {
        let table = LiveTable::open(store, filter, None, loader)?;
        self.tables.insert(T::TABLE, Box::new(table));
        tracing::debug!(table = T::TABLE.as_str(), "Watching table");
        Ok(())
    }

    /// Stop caching a table. Drops its subscription.
    pub fn unwatch(&mut self, table: Table) -> bool {
        self.tables.remove(&table).is_some()
    }

    pub fn is_watching(&self, table: Table) -> bool {
        self.tables.contains_key(&table)
    }

    pub fn table<T: Record>(&self) -> Result<&LiveTable<T>, SessionCacheError> {
        self.tables
            .get(&T::TABLE)
            .and_then(|t| t.as_any().downcast_ref::<LiveTable<T>>())
            .ok_or(SessionCacheError::NotWatched(T::TABLE))
    }

    pub fn table_mut<T: Record>(&mut self) -> Result<&mut LiveTable<T>, SessionCacheError> {
        self.tables
            .get_mut(&T::TABLE)
            .and_then(|t| t.as_any_mut().downcast_mut::<LiveTable<T>>())
            .ok_or(SessionCacheError::NotWatched(T::TABLE))
    }

    /// Drain pending changes into every watched table.
    pub fn sync(&mut self, store: &RecordStore) -> Result<usize, SessionCacheError> {
        let mut applied = 0;
        for table in self.tables.values_mut() {
            applied += table.sync(store)?;
        }
        Ok(applied)
    }

    /// Drop every table (logout).
    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SessionCacheError {
    #[error("Table {0} is not being watched")]
    NotWatched(Table),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
