//! Outdated command implementation.

use super::open_session;
use cdnsync_core::{Manifest, VersionSet, parse_version};
use std::path::Path;
use std::process::ExitCode;

/// Newest version a provider advertises: the `latest` tag, else the
/// highest parseable version.
fn newest(versions: &VersionSet) -> Option<String> {
    versions
        .latest()
        .map(str::to_string)
        .or_else(|| versions.sorted().into_iter().next())
}

/// True when `candidate` is a newer release than `current`. Versions that do
/// not parse are compared as text.
fn is_newer(current: &str, candidate: &str) -> bool {
    match (parse_version(current), parse_version(candidate)) {
        (Some(current), Some(candidate)) => candidate > current,
        _ => current != candidate,
    }
}

pub fn run(path: &Path) -> ExitCode {
    let manifest = match Manifest::from_path(path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let entries = match manifest.entries() {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if entries.is_empty() {
        println!("no libraries configured");
        return ExitCode::SUCCESS;
    }

    let Some(session) = open_session(false) else {
        return ExitCode::FAILURE;
    };
    let ctx = session.ctx();

    let mut outdated = 0;
    let mut failed = 0;
    for entry in &entries {
        let versions = match entry.provider.adapter().fetch_version_list(&ctx, &entry.library) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("error: {}: {e}", entry.library);
                failed += 1;
                continue;
            }
        };

        match newest(&versions) {
            Some(latest) if is_newer(&entry.version, &latest) => {
                println!(
                    "  {}: {} -> {} ({})",
                    entry.library, entry.version, latest, entry.provider
                );
                outdated += 1;
            }
            Some(_) => println!("  {}: {} (latest)", entry.library, entry.version),
            None => println!("  {}: {} (no versions listed)", entry.library, entry.version),
        }
    }

    if outdated == 0 {
        println!("\nall libraries up to date");
    } else {
        println!("\n{outdated} library(ies) outdated");
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
