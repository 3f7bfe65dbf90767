use std::path::Path;

use easel_core::db::ConflictStore;

use crate::cli::StatusFilter;
use crate::commands::common::{format_intervention_lines, open_store};
use crate::error::CliError;

pub async fn run_interventions(
    status: Option<StatusFilter>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let records = store
        .list_interventions(status.map(Into::into), limit)
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No intervention requests");
    } else {
        for line in format_intervention_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
