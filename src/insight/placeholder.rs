use async_trait::async_trait;

use super::{build_prompt, InsightProvider, InsightReport};
use crate::error::Result;
use crate::models::Trade;

/// Fixed-response provider. The prompt is assembled so a real model client can
/// replace this type without touching the endpoint, but no model is called and
/// the trades do not influence the answer.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderInsight;

impl PlaceholderInsight {
    pub fn fixed_report() -> InsightReport {
        InsightReport {
            resumen: "El trader muestra un desempeño mixto con algunas operaciones rentables y otras con pérdidas."
                .to_string(),
            fortalezas: vec![
                "Buena selección de símbolos rentables".to_string(),
                "Disciplina en el seguimiento de reglas en la mayoría de operaciones".to_string(),
                "Capacidad para obtener ganancias consistentes en ciertos activos".to_string(),
            ],
            areas_mejora: vec![
                "Gestión del tamaño de posición en operaciones con pérdidas".to_string(),
                "Consistencia en el seguimiento de reglas".to_string(),
                "Diversificación de activos".to_string(),
            ],
            consejos: vec![
                "Establecer un límite máximo de pérdida por operación".to_string(),
                "Documentar más detalladamente las razones de entrada y salida".to_string(),
                "Revisar y ajustar la estrategia para los símbolos con peor desempeño".to_string(),
            ],
            patron_emocional: "Se observa cierta tendencia a mantener posiciones perdedoras por más tiempo que las \
                 ganadoras, lo que podría indicar un sesgo de aversión a las pérdidas."
                .to_string(),
        }
    }
}

#[async_trait]
impl InsightProvider for PlaceholderInsight {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn analyze(&self, trades: &[Trade]) -> Result<InsightReport> {
        let prompt = build_prompt(trades)?;
        let prompt_chars: usize = prompt.messages.iter().map(|m| m.content.len()).sum();
        log::debug!(
            "Prepared {} prompt for {} trades ({} chars); returning placeholder analysis",
            prompt.model,
            trades.len(),
            prompt_chars
        );

        Ok(Self::fixed_report())
    }
}
