pub mod rule_based;

pub use rule_based::*;

use crate::model::{BatchEntry, GenericError, ModelInfo, PredictionResult, TransactionRecord};
use async_trait::async_trait;

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score a single transaction.
    async fn predict(&self, record: &TransactionRecord) -> Result<PredictionResult, GenericError>;

    /// Metadata describing the model behind this scorer.
    fn model_info(&self) -> ModelInfo;

    /// Score a list of raw records independently, preserving input order.
    ///
    /// A record that cannot be decoded or scored becomes an error entry
    /// tagged with its index; sibling records are unaffected.
    async fn predict_many(&self, records: &[serde_json::Value]) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(records.len());
        for (index, raw) in records.iter().enumerate() {
            let outcome = match TransactionRecord::from_value(raw) {
                Ok(record) => self.predict(&record).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(result) => entries.push(BatchEntry::Scored {
                    transaction_id: index,
                    result,
                }),
                Err(e) => {
                    tracing::warn!("Error processing transaction {}: {}", index, e);
                    entries.push(BatchEntry::Failed {
                        transaction_id: index,
                        error: e.to_string(),
                    });
                }
            }
        }
        entries
    }
}
