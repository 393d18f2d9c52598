//! Device token pruning

use crate::store::ReminderStore;
use anyhow::Result;
use std::collections::HashSet;
use tracing::info;

/// Deletes tokens the push service reported as permanently invalid
pub struct TokenPruner;

impl TokenPruner {
    /// Delete exactly these tokens, once each
    ///
    /// Empty input is a no-op. Tokens already gone match zero rows.
    pub async fn prune(store: &dyn ReminderStore, invalid_tokens: &[String]) -> Result<u64> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = invalid_tokens
            .iter()
            .filter(|t| !t.is_empty() && seen.insert(t.as_str()))
            .cloned()
            .collect();

        if unique.is_empty() {
            return Ok(0);
        }

        let deleted = store.delete_tokens(&unique).await?;
        info!(
            requested = unique.len(),
            deleted = deleted,
            "Pruned invalid device tokens"
        );
        Ok(deleted)
    }
}
