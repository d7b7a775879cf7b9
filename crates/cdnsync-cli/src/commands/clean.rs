//! Clean command implementation.

use cdnsync_core::Manifest;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn confirm(message: &str) -> bool {
    print!("{message} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Destinations that contain the manifest itself are never removed.
fn contains_manifest(dir: &Path, manifest: &Path) -> bool {
    match (dir.canonicalize(), manifest.canonicalize()) {
        (Ok(dir), Ok(manifest)) => manifest.starts_with(dir),
        _ => false,
    }
}

pub fn run(path: &Path, dry_run: bool, yes: bool) -> ExitCode {
    let manifest = match Manifest::from_path(path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if manifest.libraries.is_empty() {
        println!("no libraries configured");
        return ExitCode::SUCCESS;
    }

    let mut existing: BTreeMap<PathBuf, String> = BTreeMap::new();
    for name in manifest.libraries.keys() {
        let dest = match manifest.library_destination(name, &manifest.libraries[name]) {
            Ok(dest) => dest,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        };
        if !dest.is_dir() {
            continue;
        }
        if contains_manifest(&dest, path) {
            eprintln!(
                "warning: skipping {name}: {} contains the manifest",
                dest.display()
            );
            continue;
        }
        existing.entry(dest).or_insert_with(|| name.clone());
    }

    if existing.is_empty() {
        println!("nothing to clean");
        return ExitCode::SUCCESS;
    }

    for (dest, name) in &existing {
        let verb = if dry_run { "would remove" } else { "remove" };
        println!("{verb}: {name} -> {}", dest.display());
    }

    if dry_run {
        return ExitCode::SUCCESS;
    }

    if !yes && !confirm(&format!("\nremove {} director(ies)?", existing.len())) {
        println!("cancelled");
        return ExitCode::SUCCESS;
    }

    let mut failed = 0;
    for (dest, name) in &existing {
        match std::fs::remove_dir_all(dest) {
            Ok(()) => println!("removed: {name}"),
            Err(e) => {
                eprintln!("error: failed to remove {}: {e}", dest.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
