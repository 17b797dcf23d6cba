//! TriageRail processing daemon

use coordinator::{Config, Coordinator, EscalationScheduler, TracingNotifier};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting TriageRail daemon");

    // Load configuration
    let config = Config::from_env()?;
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);
    let notify_timeout = Duration::from_millis(config.notify_timeout_ms);

    // Open coordinator and its stores
    let notifier = Arc::new(TracingNotifier);
    let coordinator = Coordinator::open(config, notifier.clone())?;
    tracing::info!("Coordinator opened successfully");

    // Background SLA escalation sweeper
    let scheduler = Arc::new(EscalationScheduler::new(
        coordinator.alerts().clone(),
        notifier,
        sweep_interval,
        notify_timeout,
    ));
    let sweeper = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down TriageRail daemon");
    sweeper.abort();
    Ok(())
}
