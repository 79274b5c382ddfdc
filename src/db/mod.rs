mod connection;
pub mod migration_runner;
pub mod rules;
pub mod trades;

pub use connection::Database;

use std::str::FromStr;

use rusqlite::types::{FromSqlError, Type, ValueRef};
use rust_decimal::Decimal;

/// Reads a decimal column regardless of whether it was stored as text or as a number
pub(crate) fn decimal_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let invalid = |msg: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(FromSqlError::Other(msg.into())))
    };

    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(i) => Ok(Some(Decimal::from(i))),
        ValueRef::Real(f) => Decimal::try_from(f)
            .map(Some)
            .map_err(|e| invalid(format!("invalid decimal {}: {}", f, e))),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map(Some)
                .map_err(|e| invalid(format!("invalid decimal '{}': {}", text, e)))
        }
        ValueRef::Blob(_) => Err(rusqlite::Error::InvalidColumnType(idx, "decimal".into(), Type::Blob)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_decimal_column_storage_classes() {
        let conn = Connection::open_in_memory().unwrap();
        let values: Vec<Option<Decimal>> = conn
            .prepare("SELECT '12.50' UNION ALL SELECT 7 UNION ALL SELECT 0.25 UNION ALL SELECT NULL")
            .unwrap()
            .query_map([], |row| decimal_column(row, 0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(
            values,
            vec![
                Some(Decimal::from_str("12.50").unwrap()),
                Some(Decimal::from(7)),
                Some(Decimal::from_str("0.25").unwrap()),
                None,
            ]
        );
    }

    #[test]
    fn test_decimal_column_rejects_garbage() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 'abc'", [], |row| decimal_column(row, 0));
        assert!(result.is_err());
    }
}
