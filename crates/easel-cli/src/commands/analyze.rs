use std::path::Path;

use easel_core::ConflictAnalyzer;

use crate::commands::common::{
    format_recommendation_line, load_config, parse_conflicts, read_input, RecommendationItem,
};
use crate::error::CliError;

pub fn run_analyze(file: &Path, as_json: bool) -> Result<(), CliError> {
    let conflicts = parse_conflicts(&read_input(file)?)?;
    let analyzer = ConflictAnalyzer::new(load_config()?.catalog);

    let mut items = Vec::with_capacity(conflicts.len());
    for conflict in &conflicts {
        let recommendation = analyzer.analyze(conflict)?;
        if !as_json {
            println!("{}", format_recommendation_line(conflict, &recommendation));
        }
        items.push(RecommendationItem {
            conflict_id: conflict.id.to_string(),
            recommendation,
        });
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    }

    Ok(())
}
