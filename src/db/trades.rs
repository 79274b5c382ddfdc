use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;

use super::{decimal_column, Database};
use crate::error::{AppError, Result};
use crate::models::{NewTrade, Trade};

const TRADE_COLUMNS: &str = "id, user_id, fecha, simbolo, pnl_neto, entrada, salida, cantidad, notas, \
     reglas_cumplidas, rr, ciclo_diario, induccion, liquidez, tipo_entrada, parcial_porcentaje, \
     emocion, imagenes_urls, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Store-side selection: optional time window, ordering and row limit
#[derive(Debug, Clone)]
pub struct TradeQuery {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub order: SortOrder,
    pub limit: Option<u32>,
}

impl Default for TradeQuery {
    fn default() -> Self {
        TradeQuery {
            from: None,
            to: None,
            order: SortOrder::Descending,
            limit: None,
        }
    }
}

fn to_timestamp(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

/// Helper function to map a database row to a Trade struct
fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    let fecha: i64 = row.get(2)?;
    let executed_at = DateTime::<Utc>::from_timestamp(fecha, 0)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, fecha))?
        .naive_utc();

    let image_urls = row
        .get::<_, Option<String>>(17)?
        .map(|json| serde_json::from_str::<Vec<String>>(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(17, Type::Text, Box::new(e)))?;

    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        executed_at,
        symbol: row.get(3)?,
        net_pnl: decimal_column(row, 4)?.ok_or(rusqlite::Error::InvalidColumnType(
            4,
            "pnl_neto".into(),
            Type::Null,
        ))?,
        entry_price: decimal_column(row, 5)?,
        exit_price: decimal_column(row, 6)?,
        quantity: decimal_column(row, 7)?,
        notes: row.get(8)?,
        rules_followed: row.get::<_, i32>(9)? != 0,
        risk_reward: row.get(10)?,
        daily_cycle: row.get(11)?,
        induction: row.get(12)?,
        liquidity: row.get(13)?,
        entry_type: row.get(14)?,
        partial_exit_pct: decimal_column(row, 15)?,
        emotion: row.get(16)?,
        image_urls,
        created_at: row.get(18)?,
    })
}

impl Database {
    pub fn insert_trade(&self, user_id: &str, trade: &NewTrade) -> Result<Trade> {
        let id = format!("TRADE-{}-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4());
        let now = Utc::now().timestamp();
        let image_urls = trade.image_urls.as_ref().map(serde_json::to_string).transpose()?;

        {
            let conn = self.lock()?;
            conn.execute(
                &format!(
                    "INSERT INTO trades ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    TRADE_COLUMNS
                ),
                rusqlite::params![
                    id,
                    user_id,
                    to_timestamp(trade.executed_at),
                    trade.symbol,
                    trade.net_pnl.to_string(),
                    trade.entry_price.map(|d| d.to_string()),
                    trade.exit_price.map(|d| d.to_string()),
                    trade.quantity.map(|d| d.to_string()),
                    trade.notes,
                    trade.rules_followed as i32,
                    trade.risk_reward,
                    trade.daily_cycle,
                    trade.induction,
                    trade.liquidity,
                    trade.entry_type,
                    trade.partial_exit_pct.map(|d| d.to_string()),
                    trade.emotion,
                    image_urls,
                    now
                ],
            )?;
        }

        log::info!("Created trade {} ({} {}) for {}", id, trade.symbol, trade.net_pnl, user_id);

        self.get_trade(user_id, &id)
    }

    pub fn get_trade(&self, user_id: &str, id: &str) -> Result<Trade> {
        let conn = self.lock()?;

        conn.query_row(
            &format!("SELECT {} FROM trades WHERE id = ? AND user_id = ?", TRADE_COLUMNS),
            [id, user_id],
            map_row_to_trade,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Trade {} not found", id)),
            other => other.into(),
        })
    }

    pub fn list_trades(&self, user_id: &str, query: &TradeQuery) -> Result<Vec<Trade>> {
        let conn = self.lock()?;

        let mut sql = format!("SELECT {} FROM trades WHERE user_id = ?", TRADE_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(from) = query.from {
            sql.push_str(" AND fecha >= ?");
            params.push(Box::new(to_timestamp(from)));
        }
        if let Some(to) = query.to {
            sql.push_str(" AND fecha <= ?");
            params.push(Box::new(to_timestamp(to)));
        }

        // rowid keeps insertion order among equal timestamps
        sql.push_str(match query.order {
            SortOrder::Ascending => " ORDER BY fecha ASC, rowid ASC",
            SortOrder::Descending => " ORDER BY fecha DESC, rowid DESC",
        });

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit));
        }

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let trades = stmt
            .query_map(param_refs.as_slice(), map_row_to_trade)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(trades)
    }

    /// Permanent delete. An id the user does not own is reported as not found.
    pub fn delete_trade(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM trades WHERE id = ? AND user_id = ?", [id, user_id])?;

        if affected == 0 {
            return Err(AppError::NotFound(format!("Trade {} not found", id)));
        }

        log::info!("Deleted trade {} for {}", id, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_executed_at, TradeForm};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn new_trade(fecha: &str, pnl: &str) -> NewTrade {
        TradeForm {
            fecha: Some(fecha.into()),
            simbolo: Some("nas100".into()),
            pnl_neto: Some(pnl.into()),
            emocion: Some("Paciencia".into()),
            imagenes_urls: Some(vec!["https://img.example/1.png".into()]),
            ..Default::default()
        }
        .into_new_trade(Utc::now().naive_utc())
        .unwrap()
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let created = db.insert_trade("alice", &new_trade("2024-01-01T10:00", "100.25")).unwrap();

        assert!(created.id.starts_with("TRADE-"));
        assert_eq!(created.user_id, "alice");
        assert_eq!(created.symbol, "NAS100");
        assert_eq!(created.net_pnl, Decimal::from_str("100.25").unwrap());
        assert_eq!(created.emotion.as_deref(), Some("Paciencia"));
        assert_eq!(created.image_urls, Some(vec!["https://img.example/1.png".to_string()]));
        assert_eq!(created.entry_price, None);

        assert_eq!(db.get_trade("alice", &created.id).unwrap(), created);
    }

    #[test]
    fn test_trades_are_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let created = db.insert_trade("alice", &new_trade("2024-01-01T10:00", "1")).unwrap();

        assert!(matches!(db.get_trade("bob", &created.id), Err(AppError::NotFound(_))));
        assert!(matches!(db.delete_trade("bob", &created.id), Err(AppError::NotFound(_))));
        assert!(db.list_trades("bob", &TradeQuery::default()).unwrap().is_empty());
        assert_eq!(db.list_trades("alice", &TradeQuery::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_list_ordering_window_and_limit() {
        let db = Database::open_in_memory().unwrap();
        db.insert_trade("alice", &new_trade("2024-01-02T10:00", "2")).unwrap();
        db.insert_trade("alice", &new_trade("2024-01-01T10:00", "1")).unwrap();
        db.insert_trade("alice", &new_trade("2024-02-01T10:00", "3")).unwrap();

        let desc = db.list_trades("alice", &TradeQuery::default()).unwrap();
        let pnls: Vec<String> = desc.iter().map(|t| t.net_pnl.to_string()).collect();
        assert_eq!(pnls, vec!["3", "2", "1"]);

        let january = db
            .list_trades(
                "alice",
                &TradeQuery {
                    from: Some(parse_executed_at("2024-01-01T00:00").unwrap()),
                    to: Some(parse_executed_at("2024-01-31T23:59:59").unwrap()),
                    order: SortOrder::Ascending,
                    limit: None,
                },
            )
            .unwrap();
        let pnls: Vec<String> = january.iter().map(|t| t.net_pnl.to_string()).collect();
        assert_eq!(pnls, vec!["1", "2"]);

        let latest = db
            .list_trades(
                "alice",
                &TradeQuery {
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].net_pnl.to_string(), "3");
    }

    #[test]
    fn test_delete_is_permanent() {
        let db = Database::open_in_memory().unwrap();
        let created = db.insert_trade("alice", &new_trade("2024-01-01T10:00", "1")).unwrap();

        db.delete_trade("alice", &created.id).unwrap();
        assert!(matches!(db.get_trade("alice", &created.id), Err(AppError::NotFound(_))));
        assert!(matches!(db.delete_trade("alice", &created.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_numeric_pnl_storage_is_read_as_decimal() {
        let db = Database::open_in_memory().unwrap();
        {
            let conn = db.lock().unwrap();
            conn.execute(
                "INSERT INTO trades (id, user_id, fecha, simbolo, pnl_neto, reglas_cumplidas, created_at)
                 VALUES ('legacy', 'alice', 1704103200, 'US30', 42.5, 0, 0)",
                [],
            )
            .unwrap();
        }

        let trade = db.get_trade("alice", "legacy").unwrap();
        assert_eq!(trade.net_pnl, Decimal::from_str("42.5").unwrap());
        assert!(!trade.rules_followed);
    }
}
