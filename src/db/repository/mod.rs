//! Repository layer — table-scoped database operations.
//!
//! One sub-module per table. All public functions are re-exported here.
//! Every function takes a borrowed `Connection`; callers own locking.

mod appointment;
mod notification;
mod ocr_job;
mod physio;
mod player;
mod profile;
mod treatment;

pub use appointment::*;
pub use cmj_test::*;
pub use notification::*;
pub use ocr_job::*;
pub use physio::*;
pub use player::*;
pub use profile::*;
pub use treatment::*;

use uuid::Uuid;

use super::{parse_date, parse_timestamp, parse_uuid, DatabaseError};

pub(crate) fn opt_uuid(value: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    value.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn opt_date(value: Option<String>) -> Result<Option<chrono::NaiveDate>, DatabaseError> {
    value.as_deref().map(parse_date).transpose()
}

pub(crate) fn opt_timestamp(
    value: Option<String>,
) -> Result<Option<chrono::NaiveDateTime>, DatabaseError> {
    value.as_deref().map(parse_timestamp).transpose()
}

/// Turn "0 rows affected" into a typed not-found error.
pub(crate) fn expect_one(
    affected: usize,
    entity_type: &str,
    id: &Uuid,
) -> Result<(), DatabaseError> {
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        });
    }
    Ok(())
}
