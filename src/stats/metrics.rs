use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Trade;

/// Shown when no trade carries an emotion tag
pub const NO_EMOTION: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMetrics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub pnl_total: Decimal,
    pub win_rate: f64,
    pub rule_compliance_rate: f64,
    #[serde(rename = "emocionFrecuente")]
    pub most_frequent_emotion: String,
    pub best_trade: Option<Decimal>,
    pub worst_trade: Option<Decimal>,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// One decimal place, as displayed on the dashboard
pub fn format_percent(rate: f64) -> String {
    format!("{:.1}", rate)
}

/// Most frequent non-empty emotion. On a tie the emotion seen first wins.
fn most_frequent_emotion(trades: &[Trade]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for emotion in trades.iter().filter_map(|t| t.emotion.as_deref()).filter(|e| !e.is_empty()) {
        match counts.iter_mut().find(|(name, _)| *name == emotion) {
            Some((_, count)) => *count += 1,
            None => counts.push((emotion, 1)),
        }
    }

    let mut best = NO_EMOTION;
    let mut best_count = 0;
    for (emotion, count) in counts {
        if count > best_count {
            best = emotion;
            best_count = count;
        }
    }

    best.to_string()
}

pub fn summarize(trades: &[Trade]) -> TradeMetrics {
    let total_trades = trades.len();
    let wins = trades.iter().filter(|t| t.net_pnl > Decimal::ZERO).count();
    let losses = trades.iter().filter(|t| t.net_pnl < Decimal::ZERO).count();
    let compliant = trades.iter().filter(|t| t.rules_followed).count();

    TradeMetrics {
        total_trades,
        wins,
        losses,
        pnl_total: trades.iter().map(|t| t.net_pnl).fold(Decimal::ZERO, Decimal::saturating_add),
        win_rate: percent(wins, total_trades),
        rule_compliance_rate: percent(compliant, total_trades),
        most_frequent_emotion: most_frequent_emotion(trades),
        best_trade: trades.iter().map(|t| t.net_pnl).max(),
        worst_trade: trades.iter().map(|t| t.net_pnl).min(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trade::sample_trade;
    use std::str::FromStr;

    fn with_emotion(id: &str, emotion: Option<&str>) -> Trade {
        let mut trade = sample_trade(id, "2024-01-01T10:00", "1");
        trade.emotion = emotion.map(str::to_string);
        trade
    }

    #[test]
    fn test_empty_list() {
        let metrics = summarize(&[]);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.pnl_total, Decimal::ZERO);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.rule_compliance_rate, 0.0);
        assert_eq!(metrics.most_frequent_emotion, "-");
        assert_eq!(metrics.best_trade, None);
    }

    #[test]
    fn test_reference_example() {
        let trades = vec![
            sample_trade("1", "2024-01-01T10:00", "100"),
            sample_trade("2", "2024-01-02T10:00", "-40"),
            sample_trade("3", "2024-01-03T10:00", "10"),
        ];

        let metrics = summarize(&trades);
        assert_eq!(metrics.total_trades, 3);
        assert_eq!(metrics.pnl_total, Decimal::from(70));
        assert_eq!(format_percent(metrics.win_rate), "66.7");
        assert_eq!(metrics.wins, 2);
        assert_eq!(metrics.losses, 1);
        assert_eq!(metrics.best_trade, Some(Decimal::from(100)));
        assert_eq!(metrics.worst_trade, Some(Decimal::from(-40)));
    }

    #[test]
    fn test_total_is_order_independent_and_exact() {
        let mut trades = vec![
            sample_trade("1", "2024-01-01T10:00", "0.1"),
            sample_trade("2", "2024-01-02T10:00", "0.2"),
            sample_trade("3", "2024-01-03T10:00", "-0.3"),
        ];
        let forward = summarize(&trades).pnl_total;
        trades.reverse();
        assert_eq!(summarize(&trades).pnl_total, forward);
        assert_eq!(forward, Decimal::from_str("0.0").unwrap());
    }

    #[test]
    fn test_rates_stay_in_range() {
        let mut trades: Vec<Trade> = (0..7)
            .map(|i| sample_trade(&i.to_string(), "2024-01-01T10:00", if i % 2 == 0 { "5" } else { "-5" }))
            .collect();
        trades[0].rules_followed = false;
        trades[3].rules_followed = false;

        let metrics = summarize(&trades);
        for rate in [metrics.win_rate, metrics.rule_compliance_rate] {
            assert!((0.0..=100.0).contains(&rate));
        }
        assert_eq!(format_percent(metrics.rule_compliance_rate), "71.4");
    }

    #[test]
    fn test_breakeven_is_not_a_win() {
        let trades = vec![sample_trade("1", "2024-01-01T10:00", "0")];
        let metrics = summarize(&trades);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.losses, 0);
    }

    #[test]
    fn test_most_frequent_emotion() {
        let trades = vec![
            with_emotion("1", Some("Miedo")),
            with_emotion("2", None),
            with_emotion("3", Some("Confianza")),
            with_emotion("4", Some("Confianza")),
            with_emotion("5", Some("")),
        ];
        assert_eq!(summarize(&trades).most_frequent_emotion, "Confianza");
    }

    #[test]
    fn test_emotion_tie_goes_to_first_seen() {
        let trades = vec![
            with_emotion("1", Some("Paciencia")),
            with_emotion("2", Some("Euforia")),
            with_emotion("3", Some("Euforia")),
            with_emotion("4", Some("Paciencia")),
        ];
        assert_eq!(summarize(&trades).most_frequent_emotion, "Paciencia");
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let trades = vec![
            sample_trade("1", "2024-01-01T10:00", "79228162514264337593543950335"),
            sample_trade("2", "2024-01-02T10:00", "79228162514264337593543950335"),
        ];
        assert_eq!(summarize(&trades).pnl_total, Decimal::MAX);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(summarize(&[])).unwrap();
        for key in ["totalTrades", "pnlTotal", "winRate", "ruleComplianceRate", "emocionFrecuente"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
