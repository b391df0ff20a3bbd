//! Batch dispatch of reply actions.
//!
//! Candidates flow in from the actuator's search, are filtered for
//! eligibility (originals only, not already acted on), and the first
//! `batch_size` eligible items are attempted in source order. One item's
//! failure never aborts the batch; only a fatal actuator error aborts the
//! run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use hypeloop_common::{ActionError, Candidate};

use crate::content::ReplySelector;
use crate::dedup::{derive_id, RepliedLog, TargetId};
use crate::pacing;
use crate::quota::QuotaTracker;
use crate::stats::RunStats;
use crate::store::StateStore;
use crate::traits::Actuator;

/// Result of one dispatched batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub replies_sent: u32,
    /// Eligible candidates remained beyond this batch and the quota still
    /// allows acting on them.
    pub more_work: bool,
}

pub struct BatchDispatcher {
    actuator: Arc<dyn Actuator>,
    selector: Arc<dyn ReplySelector>,
    batch_size: usize,
    item_delay: (Duration, Duration),
}

impl BatchDispatcher {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        selector: Arc<dyn ReplySelector>,
        batch_size: usize,
        min_item_delay: Duration,
        max_item_delay: Duration,
    ) -> Self {
        Self {
            actuator,
            selector,
            batch_size,
            item_delay: (min_item_delay, max_item_delay),
        }
    }

    /// Filter candidates and reply to one batch, stopping early once
    /// `success_cap` replies have gone out. Returns how many replies went
    /// out and whether eligible work remains. Only a fatal actuator error
    /// propagates.
    pub async fn dispatch_batch(
        &self,
        candidates: Vec<Candidate>,
        success_cap: u32,
        replied: &mut RepliedLog,
        quota: &mut QuotaTracker,
        stats: &mut RunStats,
    ) -> Result<BatchOutcome, ActionError> {
        stats.candidates_seen += candidates.len() as u32;

        // Eligibility filter, source order preserved.
        let eligible: Vec<(Candidate, TargetId)> = candidates
            .into_iter()
            .filter_map(|c| {
                if !c.is_original {
                    stats.candidates_skipped += 1;
                    return None;
                }
                let id = derive_id(&c);
                if replied.has_acted_on(&id) {
                    stats.candidates_skipped += 1;
                    return None;
                }
                Some((c, id))
            })
            .collect();

        if eligible.is_empty() {
            debug!("No eligible candidates in this fetch");
            return Ok(BatchOutcome {
                replies_sent: 0,
                more_work: false,
            });
        }

        let more_beyond_batch = eligible.len() > self.batch_size;
        let batch: Vec<_> = eligible.into_iter().take(self.batch_size).collect();
        info!(batch = batch.len(), "Dispatching reply batch");

        let mut sent = 0u32;
        let batch_len = batch.len();
        for (idx, (candidate, id)) in batch.into_iter().enumerate() {
            if !quota.can_act_today() {
                info!("Daily quota reached mid-batch, stopping");
                stats.batches_dispatched += 1;
                return Ok(BatchOutcome {
                    replies_sent: sent,
                    more_work: false,
                });
            }
            if sent >= success_cap {
                stats.batches_dispatched += 1;
                return Ok(BatchOutcome {
                    replies_sent: sent,
                    more_work: true,
                });
            }

            quota.stats_for_today().attempts += 1;
            let text = self.selector.select();
            match self.actuator.reply(&candidate, &text).await {
                Ok(()) => {
                    info!(target = %id, "Replied");
                    replied.record_acted_on(id);
                    quota.stats_for_today().successes += 1;
                    stats.replies_sent += 1;
                    sent += 1;
                }
                Err(ActionError::StaleTarget) => {
                    debug!(target = %id, "Target vanished before reply, skipping");
                    quota.stats_for_today().errors += 1;
                    stats.reply_errors += 1;
                }
                Err(ActionError::Transient(msg)) => {
                    warn!(target = %id, error = msg.as_str(), "Reply failed, continuing");
                    quota.stats_for_today().errors += 1;
                    stats.reply_errors += 1;
                }
                Err(ActionError::Fatal(msg)) => {
                    quota.stats_for_today().errors += 1;
                    stats.reply_errors += 1;
                    return Err(ActionError::Fatal(msg));
                }
            }

            if idx + 1 < batch_len {
                pacing::pause(self.item_delay).await;
            }
        }

        stats.batches_dispatched += 1;
        Ok(BatchOutcome {
            replies_sent: sent,
            more_work: more_beyond_batch && quota.can_act_today(),
        })
    }

    /// The full reply phase: re-fetch candidates between batches (candidate
    /// lists are not stable across time), wait between batches, and stop on
    /// quota, an empty eligible set, or the per-phase success cap. State is
    /// flushed after every batch so a crash loses at most one batch.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_reply_loop(
        &self,
        query: &str,
        max_replies: u32,
        batch_wait: Duration,
        replied: &mut RepliedLog,
        quota: &mut QuotaTracker,
        stats: &mut RunStats,
        store: &StateStore,
    ) -> Result<u32, ActionError> {
        if !quota.can_act_today() {
            info!("Daily quota reached, skipping reply phase");
            return Ok(0);
        }

        let mut total = 0u32;
        loop {
            let candidates = match self.actuator.fetch_candidates(query).await {
                Ok(c) => c,
                Err(ActionError::Fatal(msg)) => return Err(ActionError::Fatal(msg)),
                Err(e) => {
                    warn!(error = %e, "Candidate fetch failed, ending reply phase");
                    break;
                }
            };
            if candidates.is_empty() {
                info!("No candidates found");
                break;
            }

            let result = self
                .dispatch_batch(candidates, max_replies - total, replied, quota, stats)
                .await;
            store.save(replied, quota.days());
            let outcome = result?;
            total += outcome.replies_sent;

            if total >= max_replies {
                info!(total, "Per-phase reply cap reached");
                break;
            }
            if !quota.can_act_today() {
                info!("Daily quota reached");
                break;
            }
            if outcome.replies_sent == 0 && !outcome.more_work {
                info!("No eligible candidates remain");
                break;
            }

            debug!(wait_secs = batch_wait.as_secs(), "Waiting before next batch");
            pacing::pause((batch_wait, batch_wait)).await;
        }
        Ok(total)
    }
}
