//! Cache command implementations.

use super::open_session;
use indicatif::HumanBytes;
use std::process::ExitCode;

pub fn stats() -> ExitCode {
    let Some(session) = open_session(false) else {
        return ExitCode::FAILURE;
    };

    let stats = match session.cache.stats() {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Cache: {}", stats.root.display());
    println!("  enabled:   {}", stats.enabled);
    println!("  ttl:       {}h", stats.ttl.as_secs() / 3600);
    println!(
        "  metadata:  {} entr(ies), {} expired, {}",
        stats.metadata_entries,
        stats.expired_entries,
        HumanBytes(stats.metadata_bytes)
    );
    println!(
        "  packages:  {} file(s), {}",
        stats.package_files,
        HumanBytes(stats.package_bytes)
    );
    println!("  total:     {}", HumanBytes(stats.total_bytes()));

    ExitCode::SUCCESS
}

pub fn clear() -> ExitCode {
    let Some(session) = open_session(false) else {
        return ExitCode::FAILURE;
    };

    match session.cache.clear() {
        Ok(()) => {
            println!("cleared {}", session.cache.root().display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub fn clear_packages() -> ExitCode {
    let Some(session) = open_session(false) else {
        return ExitCode::FAILURE;
    };

    match session.cache.clear_packages() {
        Ok(()) => {
            println!("cleared cached packages");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub fn clean() -> ExitCode {
    let Some(session) = open_session(false) else {
        return ExitCode::FAILURE;
    };

    match session.cache.clear_expired_metadata() {
        Ok(removed) => {
            println!("removed {removed} expired metadata entr(ies)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
