use serde::Serialize;

/// Suggested values for the entry form's categorical fields
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub simbolos: &'static [&'static str],
    pub ciclo_diario: &'static [&'static str],
    pub induccion: &'static [&'static str],
    pub liquidez: &'static [&'static str],
    pub tipo_entrada: &'static [&'static str],
    pub emocion: &'static [&'static str],
}

pub const SYMBOLS: &[&str] = &["NAS100", "SP500", "US30", "XAUUSD", "EURUSD", "GBPUSD", "AUDUSD"];

pub const DAILY_CYCLES: &[&str] = &[
    "iman invertido",
    "corona de londres",
    "paraiso tendencial",
    "latigazo magnetico",
];

pub const INDUCTIONS: &[&str] = &["Menor", "Media", "Mayor"];

pub const LIQUIDITY_PATTERNS: &[&str] = &["2TT", "3TT", "ASIA H-L", "2EQL-H", "3EQL-H", "B&R"];

pub const ENTRY_TYPES: &[&str] = &[
    "RBOS 1M",
    "LET",
    "EDM",
    "Volumen en Inductor",
    "LET+EDM",
    "Vol + LET",
    "Vol + EDM",
    "R BOS 1M+LET",
    "R BOS 1M + EDM",
    "M5 Limit",
];

pub const EMOTIONS: &[&str] = &[
    "Confianza",
    "Paciencia",
    "Euforia",
    "Neutral",
    "Ansiedad",
    "Miedo",
    "Frustración",
    "Venganza",
];

impl Catalog {
    pub fn standard() -> Self {
        Catalog {
            simbolos: SYMBOLS,
            ciclo_diario: DAILY_CYCLES,
            induccion: INDUCTIONS,
            liquidez: LIQUIDITY_PATTERNS,
            tipo_entrada: ENTRY_TYPES,
            emocion: EMOTIONS,
        }
    }
}
