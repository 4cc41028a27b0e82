use serde::{Deserialize, Serialize};
use spindle_core::PoolConfig;

/// Demo configuration.
///
/// Read from the environment (and an optional `.env` file):
/// - `SPINDLE_WORKERS`: pool size (default: available parallelism)
/// - `SPINDLE_TASKS`: number of background-work tasks (default: 20)
/// - `SPINDLE_FAIL_EVERY`: square inputs divisible by this fail (default: 3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub pool: PoolConfig,
    pub tasks: usize,
    pub fail_every: i64,
}

impl DemoConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut pool = PoolConfig::default();
        if let Some(workers) = env_parse("SPINDLE_WORKERS") {
            pool = pool.with_workers(workers);
        }

        Self {
            pool,
            tasks: env_parse("SPINDLE_TASKS").unwrap_or(20),
            fail_every: env_parse::<i64>("SPINDLE_FAIL_EVERY")
                .filter(|n| *n > 0)
                .unwrap_or(3),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment variable");
            None
        }
    }
}
