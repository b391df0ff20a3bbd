//! Top-level control loop: Publishing → Replying → Cooldown, repeated until
//! the cycle bound, the daily quota, or an external shutdown ends the run.
//!
//! Phase failures are caught at the phase boundary and logged; the loop
//! advances after a recovery delay. Only session establishment failure and
//! a fatal actuator error abort the run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use hypeloop_common::{ActionError, Config};

use crate::content::PostComposer;
use crate::dedup::RepliedLog;
use crate::dispatcher::BatchDispatcher;
use crate::pacing;
use crate::quota::QuotaTracker;
use crate::stats::RunStats;
use crate::store::StateStore;
use crate::traits::Actuator;

const INTER_POST_DELAY: (Duration, Duration) =
    (Duration::from_secs(40), Duration::from_secs(120));
const PUBLISH_RETRY_DELAY: (Duration, Duration) =
    (Duration::from_secs(60), Duration::from_secs(120));
const INTER_CYCLE_PAUSE: (Duration, Duration) =
    (Duration::from_secs(30), Duration::from_secs(90));
const COOLDOWN_JITTER_MINUS: Duration = Duration::from_secs(30);
const COOLDOWN_JITTER_PLUS: Duration = Duration::from_secs(60);
const RECOVERY_DELAY: Duration = Duration::from_secs(120);

/// Immutable per-run scheduling parameters.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub search_query: String,
    pub posts_per_cycle: u32,
    pub max_replies_per_cycle: u32,
    pub batch_wait: Duration,
    pub post_cycle_wait: Duration,
    pub max_cycles: Option<u32>,
    pub inter_post_delay: (Duration, Duration),
    pub publish_retry_delay: (Duration, Duration),
    pub inter_cycle_pause: (Duration, Duration),
    pub recovery_delay: Duration,
}

impl CycleConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_query: config.search_query.clone(),
            posts_per_cycle: config.posts_per_cycle,
            max_replies_per_cycle: config.max_replies_per_cycle,
            batch_wait: Duration::from_secs(config.batch_wait_secs),
            post_cycle_wait: Duration::from_secs(config.post_cycle_wait_secs),
            max_cycles: config.max_cycles_per_run,
            inter_post_delay: INTER_POST_DELAY,
            publish_retry_delay: PUBLISH_RETRY_DELAY,
            inter_cycle_pause: INTER_CYCLE_PAUSE,
            recovery_delay: RECOVERY_DELAY,
        }
    }
}

pub struct CycleScheduler {
    actuator: Arc<dyn Actuator>,
    composer: Option<PostComposer>,
    dispatcher: BatchDispatcher,
    store: StateStore,
    replied: RepliedLog,
    quota: QuotaTracker,
    stats: RunStats,
    cfg: CycleConfig,
    shutdown: watch::Receiver<bool>,
}

impl CycleScheduler {
    /// Build a scheduler, loading persisted state from the store. A `None`
    /// composer disables the Publishing phase only.
    pub fn new(
        actuator: Arc<dyn Actuator>,
        composer: Option<PostComposer>,
        dispatcher: BatchDispatcher,
        store: StateStore,
        cfg: CycleConfig,
        daily_quota: u32,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (ids, days) = store.load();
        Self {
            actuator,
            composer,
            dispatcher,
            store,
            replied: RepliedLog::new(ids),
            quota: QuotaTracker::new(days, daily_quota),
            stats: RunStats::default(),
            cfg,
            shutdown,
        }
    }

    /// Run cycles until the bound, the quota, or shutdown. Consumes the
    /// scheduler; returns the run stats after teardown.
    pub async fn run(mut self) -> Result<RunStats> {
        self.actuator.establish_session().await?;
        info!("Session established");

        let identity = self.actuator.identity().to_string();
        self.quota.stats_for_today().last_actuator_identity = identity.clone();

        let mut cycle = 0u32;
        loop {
            if *self.shutdown.borrow() {
                info!("Shutdown requested, stopping");
                break;
            }
            if let Some(max) = self.cfg.max_cycles {
                if cycle >= max {
                    info!(max, "Max cycles reached, stopping");
                    break;
                }
            }
            if !self.quota.can_act_today() {
                info!("Daily quota exhausted, stopping");
                break;
            }

            cycle += 1;
            info!(cycle, "Starting cycle");
            self.quota.stats_for_today().last_actuator_identity = identity.clone();

            // Publishing phase.
            match self.publish_phase().await {
                Ok(()) => {}
                Err(ActionError::Fatal(msg)) => {
                    self.teardown().await;
                    bail!("fatal actuator failure while publishing: {msg}");
                }
                Err(e) => {
                    warn!(error = %e, "Publish phase failed, recovering");
                    pacing::pause((self.cfg.recovery_delay, self.cfg.recovery_delay)).await;
                }
            }
            self.store.save(&self.replied, self.quota.days());

            // Replying phase.
            match self.reply_phase().await {
                Ok(sent) => info!(sent, "Reply phase complete"),
                Err(ActionError::Fatal(msg)) => {
                    self.teardown().await;
                    bail!("fatal actuator failure while replying: {msg}");
                }
                Err(e) => {
                    warn!(error = %e, "Reply phase failed, recovering");
                    pacing::pause((self.cfg.recovery_delay, self.cfg.recovery_delay)).await;
                }
            }

            self.stats.cycles_completed += 1;

            // Cooldown before the next cycle.
            let cooldown = pacing::jitter_around(
                self.cfg.post_cycle_wait,
                COOLDOWN_JITTER_MINUS,
                COOLDOWN_JITTER_PLUS,
            );
            info!(secs = cooldown.as_secs(), "Cooldown");
            self.pause(cooldown).await;

            let continuing = self.cfg.max_cycles.is_none_or(|max| cycle < max);
            if continuing {
                self.pause(pacing::jittered(
                    self.cfg.inter_cycle_pause.0,
                    self.cfg.inter_cycle_pause.1,
                ))
                .await;
            }
        }

        self.teardown().await;
        info!("{}", self.stats);
        Ok(self.stats)
    }

    /// Publish a configured number of original posts. A failed attempt only
    /// delays the next one; the phase always runs its full attempt count.
    async fn publish_phase(&mut self) -> Result<(), ActionError> {
        let Some(composer) = self.composer.as_ref() else {
            info!("Publishing disabled (no generation capability), skipping phase");
            return Ok(());
        };

        let total = self.cfg.posts_per_cycle;
        for attempt in 1..=total {
            info!(attempt, total, "Publishing post");

            let text = match composer.compose().await {
                Ok(t) => t,
                Err(e) => {
                    warn!(error = %e, "Post generation failed, backing off");
                    self.quota.stats_for_today().errors += 1;
                    self.stats.publish_errors += 1;
                    pacing::pause(self.cfg.publish_retry_delay).await;
                    continue;
                }
            };

            match self.actuator.publish(&text).await {
                Ok(()) => {
                    self.quota.stats_for_today().posts_made += 1;
                    self.stats.posts_published += 1;
                    info!(text = text.as_str(), "Published post");
                    if attempt < total {
                        pacing::pause(self.cfg.inter_post_delay).await;
                    }
                }
                Err(ActionError::Fatal(msg)) => {
                    self.quota.stats_for_today().errors += 1;
                    self.stats.publish_errors += 1;
                    return Err(ActionError::Fatal(msg));
                }
                Err(e) => {
                    warn!(error = %e, "Publish failed, backing off");
                    self.quota.stats_for_today().errors += 1;
                    self.stats.publish_errors += 1;
                    pacing::pause(self.cfg.publish_retry_delay).await;
                }
            }
        }
        Ok(())
    }

    async fn reply_phase(&mut self) -> Result<u32, ActionError> {
        self.dispatcher
            .run_reply_loop(
                &self.cfg.search_query,
                self.cfg.max_replies_per_cycle,
                self.cfg.batch_wait,
                &mut self.replied,
                &mut self.quota,
                &mut self.stats,
                &self.store,
            )
            .await
    }

    /// Final flush and session release. Safe to call from any phase.
    async fn teardown(&mut self) {
        self.store.save(&self.replied, self.quota.days());
        self.actuator.close_session().await;
    }

    /// Sleep that wakes early on shutdown.
    async fn pause(&mut self, d: Duration) {
        if d.is_zero() {
            return;
        }
        let changed = self.shutdown.changed();
        tokio::select! {
            _ = tokio::time::sleep(d) => {}
            _ = changed => {}
        }
    }
}
