use std::path::Path;
use std::sync::Arc;

use easel_core::clock::SystemClock;
use easel_core::notify::BroadcastNotifier;
use easel_core::EngineRuntime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::common::{load_config, open_store, parse_conflict_line, resolution_context};
use crate::error::CliError;

/// Feed newline-delimited conflicts to a running engine until stdin closes
/// and the queue is empty, or until Ctrl-C.
pub async fn run_engine(workspace: Option<String>, db_path: &Path) -> Result<(), CliError> {
    let config = load_config()?;
    let queue_tick = config.queue_tick();
    let store = open_store(db_path).await?;
    let runtime = EngineRuntime::start(
        config,
        store,
        BroadcastNotifier::default(),
        Arc::new(SystemClock),
    );
    let context = resolution_context(workspace);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0usize;
    let interrupted = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break false;
                };
                line_number += 1;
                match parse_conflict_line(&line, line_number) {
                    Ok(Some(conflict)) => {
                        if let Err(error) = runtime.engine().enqueue(conflict, context.clone()).await {
                            warn!(line = line_number, error = %error, "Conflict rejected");
                        }
                    }
                    Ok(None) => {}
                    Err(error) => warn!(error = %error, "Skipping unreadable input"),
                }
            }
            _ = tokio::signal::ctrl_c() => break true,
        }
    };

    if !interrupted {
        while runtime.engine().queue_len().await > 0 {
            tokio::select! {
                () = tokio::time::sleep(queue_tick) => {}
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    let counters = runtime.engine().counters().await;
    runtime.shutdown().await;

    info!(
        submitted = counters.submitted,
        resolved = counters.resolved(),
        manual = counters.manual_interventions,
        expired = counters.expired,
        "Engine run finished"
    );
    println!("{}", serde_json::to_string_pretty(&counters)?);

    Ok(())
}
