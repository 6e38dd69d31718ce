//! `SqliteStore` implementations of the storage traits.

mod attempts;
mod catalog;
mod progress;
mod review_items;

use chrono::{DateTime, Utc};

use crate::ids::IdError;
use crate::store::StoreError;

pub(crate) fn to_ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn opt_to_ms(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(to_ms)
}

pub(crate) fn from_ms(column: &str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("{column} out of range: {ms}")))
}

pub(crate) fn opt_from_ms(column: &str, ms: Option<i64>) -> Result<Option<DateTime<Utc>>, StoreError> {
    ms.map(|v| from_ms(column, v)).transpose()
}

pub(crate) fn corrupt_id(err: IdError) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Narrows a stored integer into the target width, flagging out-of-range rows.
pub(crate) fn narrow<T: TryFrom<i64>>(column: &str, value: i64) -> Result<T, StoreError> {
    T::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

/// Unique-index violations surface as `Conflict`; everything else stays a driver error.
pub(crate) fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Sqlx(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_round_trip() {
        let at = DateTime::from_timestamp_millis(1_767_225_600_123).unwrap();
        assert_eq!(from_ms("t", to_ms(at)).unwrap(), at);
        assert!(from_ms("t", i64::MAX).is_err());
    }

    #[test]
    fn narrowing_rejects_negative_counts() {
        assert!(narrow::<u32>("attemptsCount", -1).is_err());
        assert_eq!(narrow::<u8>("score", 80).unwrap(), 80);
    }
}
