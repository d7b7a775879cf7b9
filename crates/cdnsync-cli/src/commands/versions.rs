//! Versions command implementation.

use super::{open_session, provider_arg};
use cdnsync_core::ensure_version_available;
use std::process::ExitCode;

pub fn run(library: &str, cdn: Option<&str>, limit: usize, check: Option<&str>) -> ExitCode {
    let provider = match provider_arg(cdn) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let Some(session) = open_session(false) else {
        return ExitCode::FAILURE;
    };
    let ctx = session.ctx();

    let result = match check {
        Some(version) => ensure_version_available(&ctx, provider, library, version),
        None => provider.adapter().fetch_version_list(&ctx, library),
    };
    let versions = match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(version) = check {
        println!("{library}@{version} is available on {provider}");
        return ExitCode::SUCCESS;
    }

    let sorted = versions.sorted();
    println!("{library} on {provider}: {} version(s)", sorted.len());
    for (tag, version) in &versions.latest {
        println!("  {tag}: {version}");
    }

    if !sorted.is_empty() {
        println!();
    }
    for version in sorted.iter().take(limit) {
        println!("  {version}");
    }
    if sorted.len() > limit {
        println!("  ... and {} more", sorted.len() - limit);
    }

    ExitCode::SUCCESS
}
