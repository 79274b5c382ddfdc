//! Derived aggregates over an in-memory trade snapshot. Nothing here touches the store.

pub mod calendar;
pub mod equity_curve;
pub mod metrics;

pub use calendar::{month_pnl, month_total, CalendarMonth, DayPnl};
pub use equity_curve::{build as build_equity_curve, EquityPoint};
pub use metrics::{format_percent, summarize, TradeMetrics, NO_EMOTION};
