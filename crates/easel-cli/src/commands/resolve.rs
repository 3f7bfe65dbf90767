use std::path::Path;
use std::sync::Arc;

use easel_core::clock::SystemClock;
use easel_core::notify::BroadcastNotifier;
use easel_core::EngineRuntime;

use crate::commands::common::{
    format_outcome_line, load_config, open_store, parse_conflicts, read_input, resolution_context,
};
use crate::error::CliError;

pub async fn run_resolve(
    file: &Path,
    workspace: Option<String>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let conflicts = parse_conflicts(&read_input(file)?)?;
    let config = load_config()?;
    let store = open_store(db_path).await?;
    let runtime = EngineRuntime::start(
        config,
        store,
        BroadcastNotifier::default(),
        Arc::new(SystemClock),
    );
    let context = resolution_context(workspace);

    let mut outcomes = Vec::with_capacity(conflicts.len());
    let mut failure = None;
    for conflict in conflicts {
        match runtime
            .engine()
            .handle_conflict(conflict.clone(), context.clone())
            .await
        {
            Ok(outcome) => {
                if !as_json {
                    println!("{}", format_outcome_line(&conflict, &outcome));
                }
                outcomes.push(outcome);
            }
            Err(error) => {
                failure = Some(error);
                break;
            }
        }
    }

    runtime.shutdown().await;

    if let Some(error) = failure {
        return Err(error.into());
    }
    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }

    Ok(())
}
