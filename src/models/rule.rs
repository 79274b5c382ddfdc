use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub user_id: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleInput {
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
}

impl RuleInput {
    /// Trims the text and rejects blank rules
    pub fn validated(self) -> Result<RuleInput> {
        let nombre = self.nombre.trim().to_string();
        if nombre.is_empty() {
            return Err(AppError::Validation("rule text cannot be empty".to_string()));
        }

        Ok(RuleInput {
            nombre,
            descripcion: self
                .descripcion
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}
