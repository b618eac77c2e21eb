//! Chain consumer
//!
//! Pulls chain envelopes off the pool queues this worker serves, hands the
//! head stage to the executor, and forwards whatever is left of the chain.

use std::sync::Arc;

use anyhow::Context;
use splatforge_dispatch::TaskScheduler;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::executor::{StageDisposition, StageExecutor};

pub struct ChainConsumer {
    config: Config,
    scheduler: Arc<dyn TaskScheduler>,
    executor: StageExecutor,
}

impl ChainConsumer {
    pub fn new(config: Config, scheduler: Arc<dyn TaskScheduler>, executor: StageExecutor) -> Self {
        Self {
            config,
            scheduler,
            executor,
        }
    }

    /// Consumes chains until the process is stopped.
    pub async fn run(&self) {
        info!(
            "Consumer {} started (pools: {:?})",
            self.config.worker_id, self.config.pools
        );

        loop {
            match self.poll_once().await {
                Ok(true) => {}
                Ok(false) => debug!("No chains available"),
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                    // The blocking pop returns immediately when the broker is
                    // down; pause so the loop does not spin.
                    tokio::time::sleep(self.config.poll_timeout).await;
                }
            }
        }
    }

    /// Waits for one chain and runs its head stage.
    ///
    /// Returns `Ok(false)` when the wait timed out with nothing queued.
    pub async fn poll_once(&self) -> anyhow::Result<bool> {
        let chain = self
            .scheduler
            .next(&self.config.pools, self.config.poll_timeout)
            .await
            .context("Failed to poll for chains")?;

        let Some(chain) = chain else {
            return Ok(false);
        };

        match self.executor.execute(chain).await {
            StageDisposition::Advance(rest) => {
                if let Err(err) = self.scheduler.forward(&rest).await {
                    // The remainder never reached its queue and the envelope
                    // is already consumed. Record the failure so the row does
                    // not claim the job is still running.
                    if let Some(next) = rest.head() {
                        self.executor
                            .report_failure(
                                &rest.job_id,
                                &next.name,
                                format!("chain forward to {} queue failed: {}", next.queue, err),
                            )
                            .await;
                    }
                    return Err(err).context("Failed to forward advanced chain");
                }
            }
            StageDisposition::Completed | StageDisposition::Halted => {}
        }

        Ok(true)
    }
}
