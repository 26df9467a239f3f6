use crate::config::ReliabilityConfig;
use crate::diagnostics::health;
use anyhow::Result;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Restart budget for one supervised component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Consecutive failures tolerated before the circuit opens. 0 means unlimited.
    pub max_restarts: u32,
}

impl From<&ReliabilityConfig> for RestartPolicy {
    fn from(config: &ReliabilityConfig) -> Self {
        Self {
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            max_restarts: config.max_restarts,
        }
    }
}

/// Run `run_component` until shutdown, restarting it with exponential backoff
/// whenever it fails or returns on its own.
pub fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    policy: RestartPolicy,
    mut shutdown: watch::Receiver<bool>,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let initial_backoff = policy.initial_backoff.max(Duration::from_millis(1));
        let max_backoff = policy.max_backoff.max(initial_backoff);
        let mut backoff = initial_backoff;
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!(component = name, "component starting");
            let result = run_component().await;
            if *shutdown.borrow() {
                health::mark_component_stopped(name);
                break;
            }
            match result {
                Ok(()) => {
                    tracing::warn!(component = name, "component exited unexpectedly");
                    health::mark_component_error(name, "exited unexpectedly");
                    backoff = initial_backoff;
                }
                Err(error) => {
                    tracing::error!(component = name, %error, "component failed");
                    health::mark_component_error(name, &error);
                }
            }
            consecutive_failures = consecutive_failures.saturating_add(1);

            if policy.max_restarts > 0 && consecutive_failures > policy.max_restarts {
                tracing::error!(
                    component = name,
                    max_restarts = policy.max_restarts,
                    "component exceeded max restarts, circuit open"
                );
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(backoff) => {}
                () = stopped(&mut shutdown) => {
                    health::mark_component_stopped(name);
                    break;
                }
            }
            health::bump_component_restart(name);
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a stop signal too.
    let _ = shutdown.wait_for(|stop| *stop).await;
}
