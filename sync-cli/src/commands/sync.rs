//! Run push and pull rounds on demand.

use anyhow::Result;

use crate::engine::{self, Engine};

/// Run the sync command: a manual "sync now".
pub async fn run(engine: &Engine) -> Result<()> {
    let outcome = engine.dispatcher.trigger_sync().await;
    println!("{}", engine::describe(&outcome));
    report_error(engine)
}

/// Run the pull command: a manual full download.
///
/// Replaces every local store with the remote copy. Queued mutations are
/// kept and pushed on the next sync.
pub async fn pull(engine: &Engine) -> Result<()> {
    let outcome = engine
        .dispatcher
        .service()
        .pull_all_data_for_new_device(true)
        .await;
    println!("{}", engine::describe_pull(&outcome));
    report_error(engine)
}

fn report_error(engine: &Engine) -> Result<()> {
    let status = engine.dispatcher.status();
    if let Some(error) = &status.last_error {
        println!("Last error: {}", error);
    }
    println!("Pending: {}", status.pending);
    Ok(())
}
