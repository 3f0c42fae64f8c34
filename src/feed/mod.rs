//! Change feed: row-level insert/update/delete events per table.
//!
//! One bounded `broadcast` channel per table. Rows travel as JSON so one
//! channel type serves every table; `Subscription<T>` decodes on receipt.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{Record, Table};

/// Events buffered per table before slow subscribers start lagging.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Subscriber lagged behind by {0} events; resync required")]
    Lagged(u64),

    #[error("Change feed closed")]
    Closed,

    #[error("Could not decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Wire form of one change. For deletes `row` is the last known row.
#[derive(Debug, Clone)]
pub struct RawChange {
    pub op: ChangeOp,
    pub id: Uuid,
    pub row: Value,
}

/// Typed change as seen by a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Insert(T),
    Update(T),
    Delete { id: Uuid },
}

/// One equality predicate on a column of the row's JSON form,
/// e.g. `recipient_id = <uuid>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    fn matches(&self, row: &Value) -> bool {
        row.get(&self.column) == Some(&self.value)
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    channels: Arc<HashMap<Table, broadcast::Sender<RawChange>>>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let channels = Table::ALL
            .iter()
            .map(|table| (*table, broadcast::channel(capacity).0))
            .collect();
        Self {
            channels: Arc::new(channels),
        }
    }

    fn sender(&self, table: Table) -> &broadcast::Sender<RawChange> {
        // Every table gets a channel in `new`.
        &self.channels[&table]
    }

    /// Publish a change. Having no subscribers is fine.
    pub fn publish<T: Record>(&self, op: ChangeOp, record: &T) -> Result<usize, FeedError> {
        let change = RawChange {
            op,
            id: record.id(),
            row: serde_json::to_value(record)?,
        };
        let delivered = self.sender(T::TABLE).send(change).unwrap_or(0);
        tracing::debug!(
            table = T::TABLE.as_str(),
            op = ?op,
            id = %record.id(),
            subscribers = delivered,
            "Change published"
        );
        Ok(delivered)
    }

    pub fn subscribe<T: Record>(&self, filter: Option<Filter>) -> Subscription<T> {
        Subscription {
            rx: self.sender(T::TABLE).subscribe(),
            filter,
            _row: PhantomData,
        }
    }

    pub fn subscriber_count(&self, table: Table) -> usize {
        self.sender(table).receiver_count()
    }
}

/// Pull-based typed view of one table's changes.
pub struct Subscription<T> {
    rx: broadcast::Receiver<RawChange>,
    filter: Option<Filter>,
    _row: PhantomData<fn() -> T>,
}

impl<T: Record> Subscription<T> {
    fn accept(&self, raw: RawChange) -> Result<Option<Change<T>>, FeedError> {
        if let Some(filter) = &self.filter {
            if !filter.matches(&raw.row) {
                return Ok(None);
            }
        }
        let change = match raw.op {
            ChangeOp::Insert => Change::Insert(serde_json::from_value(raw.row)?),
            ChangeOp::Update => Change::Update(serde_json::from_value(raw.row)?),
            ChangeOp::Delete => Change::Delete { id: raw.id },
        };
        Ok(Some(change))
    }

    /// Wait for the next matching change.
    pub async fn recv(&mut self) -> Result<Change<T>, FeedError> {
        loop {
            match self.rx.recv().await {
                Ok(raw) => {
                    if let Some(change) = self.accept(raw)? {
                        return Ok(change);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(table = T::TABLE.as_str(), missed, "Feed subscriber lagged");
                    return Err(FeedError::Lagged(missed));
                }
                Err(broadcast::error::RecvError::Closed) => return Err(FeedError::Closed),
            }
        }
    }

    /// Next matching change if one is already buffered.
    pub fn try_next(&mut self) -> Result<Option<Change<T>>, FeedError> {
        loop {
            match self.rx.try_recv() {
                Ok(raw) => {
                    if let Some(change) = self.accept(raw)? {
                        return Ok(Some(change));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    tracing::warn!(table = T::TABLE.as_str(), missed, "Feed subscriber lagged");
                    return Err(FeedError::Lagged(missed));
                }
                Err(broadcast::error::TryRecvError::Closed) => return Err(FeedError::Closed),
            }
        }
    }

    /// Stream form. Ends when the feed closes.
    pub fn into_stream(self) -> impl Stream<Item = Result<Change<T>, FeedError>> {
        stream::unfold(self, |mut sub| async move {
            match sub.recv().await {
                Err(FeedError::Closed) => None,
                item => Some((item, sub)),
            }
        })
    }
}
