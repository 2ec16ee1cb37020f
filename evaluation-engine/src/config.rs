use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub judge_host: String,
    pub judge_port: u16,
    pub judge_default_memory_limit_kb: i32,
    pub judge_default_time_limit_sec: f64,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub dispatch_poll_interval_ms: u64,
    pub judge_queue_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            judge_host: "localhost".to_string(),
            judge_port: 2358,
            judge_default_memory_limit_kb: 262144,
            judge_default_time_limit_sec: 2.0,
            worker_count: 8,
            queue_capacity: 1000,
            dispatch_poll_interval_ms: 10,
            judge_queue_backoff_ms: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let judge_host = std::env::var("JUDGE_HOST").unwrap_or(defaults.judge_host);
        let judge_port = std::env::var("JUDGE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.judge_port);
        let judge_default_memory_limit_kb = std::env::var("JUDGE_DEFAULT_MEMORY_LIMIT_KB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.judge_default_memory_limit_kb);
        let judge_default_time_limit_sec = std::env::var("JUDGE_DEFAULT_TIME_LIMIT_SEC")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.judge_default_time_limit_sec);
        let worker_count = std::env::var("WORKER_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.worker_count);
        let queue_capacity = std::env::var("QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.queue_capacity);
        let dispatch_poll_interval_ms = std::env::var("DISPATCH_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.dispatch_poll_interval_ms);
        let judge_queue_backoff_ms = std::env::var("JUDGE_QUEUE_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.judge_queue_backoff_ms);

        Ok(Config {
            judge_host,
            judge_port,
            judge_default_memory_limit_kb,
            judge_default_time_limit_sec,
            worker_count,
            queue_capacity,
            dispatch_poll_interval_ms,
            judge_queue_backoff_ms,
        })
    }

    pub fn dispatch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_poll_interval_ms)
    }

    pub fn judge_queue_backoff(&self) -> Duration {
        Duration::from_millis(self.judge_queue_backoff_ms)
    }
}
