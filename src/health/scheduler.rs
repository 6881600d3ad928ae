//! Periodic driver for the health engine.
//!
//! # Responsibilities
//! - Run `check_all` every `interval_secs`
//! - Run the cool-down sweeps every `cooldown_interval_secs`
//! - Stop on the shutdown signal

use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tokio::sync::broadcast;
use crate::config::HealthCheckConfig;
use crate::health::engine::HealthEngine;

pub struct HealthScheduler {
    engine: Arc<HealthEngine>,
    config: HealthCheckConfig,
}

impl HealthScheduler {
    pub fn new(engine: Arc<HealthEngine>, config: HealthCheckConfig) -> Self {
        Self { engine, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Proxy health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            cooldown_interval = self.config.cooldown_interval_secs,
            probe_url = %self.config.probe_url,
            "Health scheduler starting"
        );

        let mut check_ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        let mut cooldown_ticker = time::interval(Duration::from_secs(self.config.cooldown_interval_secs.max(1)));
        check_ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        cooldown_ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = check_ticker.tick() => {
                    if let Err(e) = self.engine.check_all().await {
                        tracing::error!(error = %e, "Health sweep failed");
                    }
                }
                _ = cooldown_ticker.tick() => {
                    self.cooldown_sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn cooldown_sweep(&self) {
        if let Err(e) = self.engine.cool_down_errors().await {
            tracing::error!(error = %e, "Cool-down sweep failed");
        }
        if let Err(e) = self.engine.reset_cooldowns().await {
            tracing::error!(error = %e, "Cooldown reset failed");
        }
    }
}
