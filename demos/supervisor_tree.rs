//! # Demo: supervisor_tree
//!
//! Builds a two-level supervisor tree spanning both bridged runtimes and tears it down
//! from the root.
//!
//! Shows how to:
//! - Wrap tokio tasks and thread-pool futures as [`Work`].
//! - Expose a child supervisor as a tokio task and supervise it from a root.
//! - Watch the lifecycle through [`LogWriter`] and `tracing-subscriber`.
//!
//! ## Flow
//! ```text
//! root (Operation)
//!  ├─► ticker (TaskHandle)
//!  └─► child (exposed as TaskHandle)
//!        ├─► cruncher (FutureHandle, completes on its own → pruned)
//!        └─► sleeper  (FutureHandle)
//!
//! root.abort() ─► child aborted ─► sleeper cancelled
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example supervisor_tree --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use workvisor::{
    FutureHandle, FuturePlatform, LogWriter, Output, Subscribe, Supervisor, SupervisorConfig,
    TaskHandle, Work,
};

fn subscribers() -> Vec<Arc<dyn Subscribe>> {
    vec![Arc::new(LogWriter::new())]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pool = FuturePlatform::detect().ok_or("thread pool unavailable")?;

    let root = Supervisor::builder(SupervisorConfig::named("root"))
        .with_subscribers(subscribers())
        .build()?;
    let child = Supervisor::builder(SupervisorConfig::named("child"))
        .with_subscribers(subscribers())
        .expose::<TaskHandle>()
        .build()?;

    let ticker = TaskHandle::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_millis(200));
        for n in 1u64.. {
            interval.tick().await;
            tracing::info!(n, "tick");
        }
        Ok(Output::unit())
    });
    let cruncher = FutureHandle::spawn(pool.pool(), async {
        let sum: u64 = (1..=1_000_000u64).sum();
        Ok(Output::new(sum))
    })?;
    let sleeper = FutureHandle::spawn(pool.pool(), futures::future::pending())?;

    child.orchestrate_all([Work::from(cruncher.clone()), Work::from(sleeper.clone())]);
    root.orchestrate(&Work::from(ticker.clone()));
    root.orchestrate(&child);
    root.start()?;

    tokio::time::sleep(Duration::from_millis(700)).await;
    tracing::info!(root = root.active_len(), child = child.active_len(), "tree running");

    root.abort()?;
    let child_conclusion = child.operation().concluded().await;
    let sleeper_conclusion = sleeper.join().await;
    let ticker_conclusion = ticker.join().await;
    tracing::info!(
        child = child_conclusion.as_label(),
        sleeper = sleeper_conclusion.as_label(),
        ticker = ticker_conclusion.as_label(),
        "tree concluded"
    );

    // Let the subscriber workers flush.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
