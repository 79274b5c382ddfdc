use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    /// Display date, `dd/mm/yyyy`
    pub date: String,
    pub timestamp: NaiveDateTime,
    pub cumulative_pnl: Decimal,
}

/// Running total of net P&L in execution order. Trades sharing a timestamp
/// keep the order they were given in.
pub fn build(trades: &[Trade]) -> Vec<EquityPoint> {
    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by_key(|t| t.executed_at);

    let mut cumulative_pnl = Decimal::ZERO;
    sorted
        .into_iter()
        .map(|trade| {
            cumulative_pnl = cumulative_pnl.saturating_add(trade.net_pnl);
            EquityPoint {
                date: trade.executed_at.format("%d/%m/%Y").to_string(),
                timestamp: trade.executed_at,
                cumulative_pnl,
            }
        })
        .collect()
}
