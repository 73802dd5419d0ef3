//! Keep the broadcast process up.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};

use crate::controller::StreamController;
use crate::RESTART_DELAY_MS;

/// Restart policy for the broadcast process.
///
/// Unlike network reconnects this never gives up: the broadcast must
/// eventually come back, so every attempt waits the same fixed delay.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    /// Delay between a process exit and the next launch.
    pub delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(RESTART_DELAY_MS),
        }
    }
}

impl RestartPolicy {
    /// Delay before the given attempt (1-based). Constant across attempts.
    pub fn delay_for_attempt(&self, _attempt: u64) -> Duration {
        self.delay
    }
}

/// Launch the broadcast process forever, relaunching after every exit.
#[instrument(name = "stream_supervisor", skip_all)]
pub async fn run_forever(controller: Arc<StreamController>, policy: RestartPolicy) {
    let mut attempt = 0u64;

    loop {
        attempt += 1;
        info!(attempt, "Starting stream");

        match controller.start().await {
            Ok(reason) => info!(attempt, "Stream ended: {}", reason.message()),
            Err(e) => error!(attempt, "Error starting stream: {}", e),
        }

        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_policy_delay_is_constant() {
        let policy = RestartPolicy::default();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(1_000), Duration::from_secs(3));
    }
}
