//! Search command implementation.

use super::open_session;
use cdnsync_core::{SearchResult, SearchScope, search};
use std::process::ExitCode;

const DESCRIPTION_WIDTH: usize = 60;

/// Cut `text` to at most `width` characters, marking the cut with `...`.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn providers(result: &SearchResult) -> String {
    result
        .providers
        .iter()
        .map(|p| p.id())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn run(query: &str, cdn: &str, limit: usize, json: bool) -> ExitCode {
    let Some(scope) = SearchScope::from_id(cdn) else {
        eprintln!("error: unknown catalogue '{cdn}' (expected all, cdnjs or npm)");
        return ExitCode::FAILURE;
    };

    let Some(session) = open_session(false) else {
        return ExitCode::FAILURE;
    };

    let results = match search(&session.ctx(), query, scope, limit) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if json {
        return match serde_json::to_string_pretty(&results) {
            Ok(out) => {
                println!("{out}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if results.is_empty() {
        println!("no libraries found for '{query}' on {scope}");
        return ExitCode::SUCCESS;
    }

    println!("{:<30} {:<12} {:<22} DESCRIPTION", "PACKAGE", "VERSION", "CDN");
    for result in &results {
        println!(
            "{:<30} {:<12} {:<22} {}",
            result.name,
            result.version,
            providers(result),
            truncate(&result.description, DESCRIPTION_WIDTH)
        );
    }
    println!("\n{} result(s)", results.len());

    ExitCode::SUCCESS
}
