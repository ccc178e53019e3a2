//! Startup reconciliation between the index and the backend.
//!
//! The index only records what this process believed at its last save. The
//! backend knows what actually exists. Reconciliation merges both views,
//! drops what can no longer be resolved, and rewrites the index so the next
//! start sees the repaired list.

use std::collections::HashMap;

use bgdl_core::download::{ResumeToken, TransferInfo, canonical_file_path};
use bgdl_core::ports::DownloadBackend;

use crate::index::IndexFile;

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Surviving transfers keyed by canonical destination path.
    pub transfers: HashMap<String, TransferInfo>,
    /// Index tokens the backend could not resolve.
    pub dropped_tokens: usize,
    /// Recreated transfers missing from the backend's live list.
    pub dropped_stale: usize,
    /// Live transfers the index did not list.
    pub attached: usize,
    /// Transfers discarded because another claimed the same destination.
    pub duplicates: usize,
}

impl ReconcileOutcome {
    fn insert(&mut self, info: TransferInfo) {
        let key = canonical_file_path(&info.file_path);
        if let Some(previous) = self.transfers.insert(key, info) {
            self.duplicates += 1;
            tracing::warn!(
                target: "bgdl.registry",
                file_path = %previous.file_path,
                discarded = %previous.token,
                "Two transfers share one destination; keeping the later one"
            );
        }
    }

    /// Tokens of the surviving transfers, ordered by destination.
    pub fn tokens(&self) -> Vec<&ResumeToken> {
        let mut entries: Vec<_> = self.transfers.values().collect();
        entries.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        entries.into_iter().map(|info| &info.token).collect()
    }
}

/// Re-attach to outstanding transfers and repair the index.
///
/// Never fails: unreadable index content, unresolvable tokens and backend
/// errors are logged and skipped. The index is rewritten at the end.
pub async fn reconcile(backend: &dyn DownloadBackend, index: &IndexFile) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    let tokens = index.read_tokens().unwrap_or_else(|e| {
        tracing::warn!(
            target: "bgdl.index",
            path = %index.path().display(),
            error = %e,
            "Failed to read download index; starting empty"
        );
        Vec::new()
    });

    for token in tokens {
        match backend.recreate(&token).await {
            Ok(Some(info)) => outcome.insert(info),
            Ok(None) => {
                outcome.dropped_tokens += 1;
                tracing::warn!(
                    target: "bgdl.registry",
                    token = %token,
                    "Backend no longer knows this download; dropping it"
                );
            }
            Err(e) => {
                outcome.dropped_tokens += 1;
                tracing::warn!(
                    target: "bgdl.registry",
                    token = %token,
                    error = %e,
                    "Failed to recreate download; dropping it"
                );
            }
        }
    }

    match backend.enumerate().await {
        Ok(live) => {
            let live_tokens: Vec<ResumeToken> = live.iter().map(|i| i.token.clone()).collect();
            let before = outcome.transfers.len();
            outcome
                .transfers
                .retain(|_, info| live_tokens.contains(&info.token));
            outcome.dropped_stale = before - outcome.transfers.len();

            for info in live {
                let known = outcome
                    .transfers
                    .get(&canonical_file_path(&info.file_path))
                    .is_some_and(|existing| existing.token == info.token);
                if !known {
                    outcome.attached += 1;
                    outcome.insert(info);
                }
            }
        }
        Err(e) if e.is_unsupported() => {
            tracing::debug!(
                target: "bgdl.registry",
                backend = backend.name(),
                "Backend cannot enumerate transfers; trusting the index"
            );
        }
        Err(e) => {
            tracing::warn!(
                target: "bgdl.registry",
                backend = backend.name(),
                error = %e,
                "Failed to enumerate transfers; trusting the index"
            );
        }
    }

    let tokens = outcome.tokens().into_iter().cloned().collect();
    if let Err(e) = index.persist(tokens).await {
        tracing::warn!(
            target: "bgdl.index",
            path = %index.path().display(),
            error = %e,
            "Failed to rewrite download index after reconciliation"
        );
    }

    tracing::info!(
        target: "bgdl.registry",
        backend = backend.name(),
        active = outcome.transfers.len(),
        attached = outcome.attached,
        dropped = outcome.dropped_tokens + outcome.dropped_stale,
        "Reconciled background downloads"
    );
    outcome
}
