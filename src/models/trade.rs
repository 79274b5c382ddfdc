use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "fecha")]
    pub executed_at: NaiveDateTime,
    #[serde(rename = "simbolo")]
    pub symbol: String,
    #[serde(rename = "pnl_neto")]
    pub net_pnl: Decimal,
    #[serde(rename = "entrada")]
    pub entry_price: Option<Decimal>,
    #[serde(rename = "salida")]
    pub exit_price: Option<Decimal>,
    #[serde(rename = "cantidad")]
    pub quantity: Option<Decimal>,
    #[serde(rename = "notas")]
    pub notes: Option<String>,
    #[serde(rename = "reglas_cumplidas")]
    pub rules_followed: bool,
    #[serde(rename = "rr")]
    pub risk_reward: Option<String>,
    #[serde(rename = "ciclo_diario")]
    pub daily_cycle: Option<String>,
    #[serde(rename = "induccion")]
    pub induction: Option<String>,
    #[serde(rename = "liquidez")]
    pub liquidity: Option<String>,
    #[serde(rename = "tipo_entrada")]
    pub entry_type: Option<String>,
    #[serde(rename = "parcial_porcentaje")]
    pub partial_exit_pct: Option<Decimal>,
    #[serde(rename = "emocion")]
    pub emotion: Option<String>,
    #[serde(rename = "imagenes_urls")]
    pub image_urls: Option<Vec<String>>,
    pub created_at: i64,
}

/// A validated trade ready to be inserted. The owner is attached by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub executed_at: NaiveDateTime,
    pub symbol: String,
    pub net_pnl: Decimal,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub notes: Option<String>,
    pub rules_followed: bool,
    pub risk_reward: Option<String>,
    pub daily_cycle: Option<String>,
    pub induction: Option<String>,
    pub liquidity: Option<String>,
    pub entry_type: Option<String>,
    pub partial_exit_pct: Option<Decimal>,
    pub emotion: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

/// Raw entry form. Numeric fields arrive as text (or bare JSON numbers).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeForm {
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub simbolo: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub pnl_neto: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub entrada: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub salida: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub cantidad: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
    #[serde(default)]
    pub reglas_cumplidas: Option<bool>,
    #[serde(default)]
    pub rr: Option<String>,
    #[serde(default)]
    pub ciclo_diario: Option<String>,
    #[serde(default)]
    pub induccion: Option<String>,
    #[serde(default)]
    pub liquidez: Option<String>,
    #[serde(default)]
    pub tipo_entrada: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub parcial_porcentaje: Option<String>,
    #[serde(default)]
    pub emocion: Option<String>,
    #[serde(default)]
    pub imagenes_urls: Option<Vec<String>>,
}

fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

/// Empty or whitespace-only text becomes `None`
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Largest magnitude accepted for any amount on the form. Running totals over
/// any realistic history stay far below `Decimal::MAX`.
pub const MAX_ABS_AMOUNT: i64 = 1_000_000_000_000;

fn parse_decimal(field: &str, value: Option<String>) -> Result<Option<Decimal>> {
    let Some(text) = non_blank(value) else {
        return Ok(None);
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| AppError::Validation(format!("{} is not a valid number: '{}'", field, text)))?;

    if amount.abs() > Decimal::from(MAX_ABS_AMOUNT) {
        return Err(AppError::Validation(format!(
            "{} must be between -{} and {}",
            field, MAX_ABS_AMOUNT, MAX_ABS_AMOUNT
        )));
    }

    Ok(Some(amount))
}

/// Accepts `datetime-local` input (with or without seconds) or RFC 3339
pub fn parse_executed_at(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();

    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }

    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc).naive_utc())
        .map_err(|_| AppError::Validation(format!("fecha is not a valid date-time: '{}'", text)))
}

impl TradeForm {
    /// Coerce and validate the form. Only `pnl_neto` is mandatory.
    pub fn into_new_trade(self, now: NaiveDateTime) -> Result<NewTrade> {
        let net_pnl = parse_decimal("pnl_neto", self.pnl_neto)?
            .ok_or_else(|| AppError::Validation("pnl_neto is required".to_string()))?;

        let executed_at = match non_blank(self.fecha) {
            Some(text) => parse_executed_at(&text)?,
            None => now,
        };

        let image_urls = self
            .imagenes_urls
            .map(|urls| {
                urls.into_iter()
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|urls| !urls.is_empty());

        Ok(NewTrade {
            executed_at,
            symbol: self.simbolo.unwrap_or_default().trim().to_uppercase(),
            net_pnl,
            entry_price: parse_decimal("entrada", self.entrada)?,
            exit_price: parse_decimal("salida", self.salida)?,
            quantity: parse_decimal("cantidad", self.cantidad)?,
            notes: non_blank(self.notas),
            rules_followed: self.reglas_cumplidas.unwrap_or(true),
            risk_reward: non_blank(self.rr),
            daily_cycle: non_blank(self.ciclo_diario),
            induction: non_blank(self.induccion),
            liquidity: non_blank(self.liquidez),
            entry_type: non_blank(self.tipo_entrada),
            partial_exit_pct: parse_decimal("parcial_porcentaje", self.parcial_porcentaje)?,
            emotion: non_blank(self.emocion),
            image_urls,
        })
    }
}

/// Listing filters, applied after the ordered fetch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilters {
    pub symbol: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TradeFilters {
    /// Symbol is a case-insensitive substring; the date range is inclusive
    /// of whole calendar days on both ends.
    pub fn matches(&self, trade: &Trade) -> bool {
        let symbol_ok = match self.symbol.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => trade
                .symbol
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        };

        let day = trade.executed_at.date();
        let start_ok = self.start.is_none_or(|start| day >= start);
        let end_ok = self.end.is_none_or(|end| day <= end);

        symbol_ok && start_ok && end_ok
    }

    pub fn apply(&self, trades: &[Trade]) -> Vec<Trade> {
        trades.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_trade(id: &str, executed_at: &str, pnl: &str) -> Trade {
    Trade {
        id: id.to_string(),
        user_id: "alice".to_string(),
        executed_at: parse_executed_at(executed_at).unwrap(),
        symbol: "NAS100".to_string(),
        net_pnl: Decimal::from_str(pnl).unwrap(),
        entry_price: None,
        exit_price: None,
        quantity: None,
        notes: None,
        rules_followed: true,
        risk_reward: None,
        daily_cycle: None,
        induction: None,
        liquidity: None,
        entry_type: None,
        partial_exit_pct: None,
        emotion: None,
        image_urls: None,
        created_at: 0,
    }
}
