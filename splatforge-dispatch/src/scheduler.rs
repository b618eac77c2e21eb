//! Task scheduler
//!
//! Contract and implementations for the queue broker that carries chain
//! envelopes between the gateway and the worker pools. Each resource pool
//! has one queue; envelopes are pushed to the queue of their head stage and
//! popped by whichever worker serves that pool.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::chain::ChainEnvelope;
use crate::error::SchedulerError;

/// Scheduler contract.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Submits a new chain, enqueueing it on its head stage's pool queue.
    /// Returns the run id under which the chain was accepted.
    async fn submit(&self, chain: &ChainEnvelope) -> Result<String, SchedulerError>;

    /// Pops the next chain from the first non-empty of `queues`, waiting up
    /// to `timeout`. Returns `None` when nothing arrived in time.
    async fn next(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<ChainEnvelope>, SchedulerError>;

    /// Re-enqueues an advanced chain on its new head stage's pool queue.
    async fn forward(&self, chain: &ChainEnvelope) -> Result<(), SchedulerError>;
}

/// Backoff policy for establishing the broker connection.
///
/// Workers and brokers often start simultaneously in container
/// environments, so the first connection attempts are expected to fail.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Redis Implementation
// =============================================================================

/// Redis-backed [`TaskScheduler`].
///
/// Chains live as JSON payloads on `splatforge:queue:{pool}` lists, pushed
/// with LPUSH and popped with BRPOP so each envelope is delivered to exactly
/// one worker.
pub struct RedisScheduler {
    conn: MultiplexedConnection,
}

impl RedisScheduler {
    /// Connects to the broker, retrying with exponential backoff according
    /// to `policy`.
    pub async fn connect(redis_url: &str, policy: RetryPolicy) -> Result<Self, SchedulerError> {
        let client = redis::Client::open(redis_url)?;

        let mut attempt = 0;
        let mut delay = policy.initial_delay;

        loop {
            attempt += 1;

            match client.get_multiplexed_async_connection().await {
                Ok(conn) => {
                    if attempt > 1 {
                        info!("Connected to broker after {} attempts", attempt);
                    }
                    return Ok(Self { conn });
                }
                Err(e) => {
                    if attempt >= policy.max_attempts {
                        return Err(SchedulerError::Unavailable(format!(
                            "giving up after {} attempts: {}",
                            attempt, e
                        )));
                    }

                    warn!(
                        "Broker connection attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt, policy.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(policy.max_delay);
                }
            }
        }
    }

    fn queue_key(queue: &str) -> String {
        format!("splatforge:queue:{}", queue)
    }

    async fn enqueue(&self, chain: &ChainEnvelope) -> Result<(), SchedulerError> {
        let Some(head) = chain.head() else {
            return Err(SchedulerError::EmptyChain(chain.run_id.clone()));
        };

        let payload = serde_json::to_string(chain)?;
        let mut conn = self.conn.clone();

        let _: () = redis::cmd("LPUSH")
            .arg(Self::queue_key(&head.queue))
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TaskScheduler for RedisScheduler {
    async fn submit(&self, chain: &ChainEnvelope) -> Result<String, SchedulerError> {
        self.enqueue(chain).await?;
        Ok(chain.run_id.clone())
    }

    async fn next(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<ChainEnvelope>, SchedulerError> {
        let mut cmd = redis::cmd("BRPOP");
        for queue in queues {
            cmd.arg(Self::queue_key(queue));
        }
        cmd.arg(timeout.as_secs_f64());

        let mut conn = self.conn.clone();
        let reply: Option<(String, String)> = cmd.query_async(&mut conn).await?;

        match reply {
            Some((_queue, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn forward(&self, chain: &ChainEnvelope) -> Result<(), SchedulerError> {
        self.enqueue(chain).await
    }
}

// =============================================================================
// In-Memory Implementation
// =============================================================================

/// Queue-per-pool scheduler backed by process memory.
///
/// Stands in for the Redis broker in tests and single-node development.
pub struct MemoryScheduler {
    queues: Mutex<HashMap<String, VecDeque<ChainEnvelope>>>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Number of chains currently parked across all queues.
    pub async fn depth(&self) -> usize {
        self.queues.lock().await.values().map(|q| q.len()).sum()
    }

    async fn enqueue(&self, chain: &ChainEnvelope) -> Result<(), SchedulerError> {
        let Some(head) = chain.head() else {
            return Err(SchedulerError::EmptyChain(chain.run_id.clone()));
        };

        self.queues
            .lock()
            .await
            .entry(head.queue.clone())
            .or_default()
            .push_back(chain.clone());

        Ok(())
    }

    async fn pop(&self, queues: &[String]) -> Option<ChainEnvelope> {
        let mut map = self.queues.lock().await;

        for queue in queues {
            if let Some(parked) = map.get_mut(queue) {
                if let Some(chain) = parked.pop_front() {
                    return Some(chain);
                }
            }
        }

        None
    }
}

impl Default for MemoryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskScheduler for MemoryScheduler {
    async fn submit(&self, chain: &ChainEnvelope) -> Result<String, SchedulerError> {
        self.enqueue(chain).await?;
        Ok(chain.run_id.clone())
    }

    async fn next(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<ChainEnvelope>, SchedulerError> {
        if let Some(chain) = self.pop(queues).await {
            return Ok(Some(chain));
        }

        if timeout.is_zero() {
            return Ok(None);
        }

        // One more look after the timeout; close enough to a blocking pop
        // for development use.
        tokio::time::sleep(timeout).await;
        Ok(self.pop(queues).await)
    }

    async fn forward(&self, chain: &ChainEnvelope) -> Result<(), SchedulerError> {
        self.enqueue(chain).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splatforge_core::domain::pipeline::PipelineDefinition;

    fn cpu_and_gpu() -> Vec<String> {
        vec!["cpu".to_string(), "gpu".to_string()]
    }

    #[tokio::test]
    async fn test_submit_then_next_returns_the_chain() {
        let scheduler = MemoryScheduler::new();
        let chain = ChainEnvelope::build("abcdefghijkl", &PipelineDefinition::standard());

        let run_id = scheduler.submit(&chain).await.unwrap();
        assert_eq!(run_id, chain.run_id);

        let popped = scheduler
            .next(&cpu_and_gpu(), Duration::ZERO)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped, chain);
        assert_eq!(scheduler.depth().await, 0);
    }

    #[tokio::test]
    async fn test_next_on_empty_queues_returns_none() {
        let scheduler = MemoryScheduler::new();

        let popped = scheduler.next(&cpu_and_gpu(), Duration::ZERO).await.unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn test_chains_are_only_visible_to_their_pool() {
        let scheduler = MemoryScheduler::new();
        let chain = ChainEnvelope::build("abcdefghijkl", &PipelineDefinition::standard());

        // The standard chain starts on the cpu queue.
        scheduler.submit(&chain).await.unwrap();

        let gpu_only = vec!["gpu".to_string()];
        assert!(scheduler.next(&gpu_only, Duration::ZERO).await.unwrap().is_none());

        let cpu_only = vec!["cpu".to_string()];
        assert!(scheduler.next(&cpu_only, Duration::ZERO).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_forward_moves_the_chain_to_the_new_head_queue() {
        let scheduler = MemoryScheduler::new();
        let mut chain = ChainEnvelope::build("abcdefghijkl", &PipelineDefinition::standard());

        // Advance until train_model is the head; it routes to the gpu pool.
        while chain.head().unwrap().name != "train_model" {
            chain = chain.advance().unwrap();
        }

        scheduler.forward(&chain).await.unwrap();

        let gpu_only = vec!["gpu".to_string()];
        let popped = scheduler
            .next(&gpu_only, Duration::ZERO)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.head().unwrap().name, "train_model");
    }

    #[tokio::test]
    async fn test_queues_are_fifo() {
        let scheduler = MemoryScheduler::new();
        let pipeline = PipelineDefinition::standard();

        let first = ChainEnvelope::build("aaaaaaaaaaaa", &pipeline);
        let second = ChainEnvelope::build("bbbbbbbbbbbb", &pipeline);
        scheduler.submit(&first).await.unwrap();
        scheduler.submit(&second).await.unwrap();

        let queues = cpu_and_gpu();
        let one = scheduler.next(&queues, Duration::ZERO).await.unwrap().unwrap();
        let two = scheduler.next(&queues, Duration::ZERO).await.unwrap().unwrap();

        assert_eq!(one.job_id, "aaaaaaaaaaaa");
        assert_eq!(two.job_id, "bbbbbbbbbbbb");
    }
}
