use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Trade;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_PROMPT: &str = "Eres un analista experto en trading que ayuda a traders a mejorar su desempeño. \
Analiza el historial de operaciones y proporciona insights valiosos.";

const RESPONSE_SHAPE: &str = r#"{
  "resumen": "Un resumen general del desempeño del trader",
  "fortalezas": ["Fortaleza 1", "Fortaleza 2", ...],
  "areas_mejora": ["Área de mejora 1", "Área de mejora 2", ...],
  "consejos": ["Consejo 1", "Consejo 2", ...],
  "patron_emocional": "Análisis del patrón emocional basado en las operaciones"
}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completion style request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

pub fn build_prompt(trades: &[Trade]) -> Result<ChatRequest> {
    let trades_json = serde_json::to_string(trades)?;

    Ok(ChatRequest {
        model: DEFAULT_MODEL.to_string(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: format!(
                    "Analiza estas operaciones de trading y proporciona un análisis detallado:\n{}\n\n\
                     Responde con un JSON con el siguiente formato:\n{}",
                    trades_json, RESPONSE_SHAPE
                ),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trade::sample_trade;

    #[test]
    fn test_prompt_embeds_trades_and_shape() {
        let trades = vec![sample_trade("TRADE-1", "2024-01-01T10:00", "100")];
        let request = build_prompt(&trades).unwrap();

        assert_eq!(request.model, DEFAULT_MODEL);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");

        let user = &request.messages[1].content;
        assert!(user.contains("TRADE-1"));
        assert!(user.contains("patron_emocional"));
    }
}
