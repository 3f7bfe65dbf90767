use std::path::Path;
use std::sync::Arc;

use easel_core::analytics::AnalyticsService;
use easel_core::clock::SystemClock;

use crate::commands::common::{build_filter, format_analytics_lines, open_store};
use crate::error::CliError;

pub async fn run_analytics(
    workspace: Option<String>,
    since: Option<&str>,
    until: Option<&str>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let filter = build_filter(workspace, since, until)?;
    let store = open_store(db_path).await?;
    let analytics = AnalyticsService::new(store, Arc::new(SystemClock))
        .query(&filter)
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
    } else {
        for line in format_analytics_lines(&analytics) {
            println!("{line}");
        }
    }

    Ok(())
}
