mod commands;
mod logging;

use cdnsync_core::MANIFEST_FILE;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cdnsync")]
#[command(version, about = "Vendor front-end libraries from unpkg, cdnjs and jsDelivr")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download every file the manifest needs
    Sync {
        /// Path to the manifest file
        #[arg(short, long, default_value = MANIFEST_FILE)]
        manifest: PathBuf,

        /// Re-download files that already exist, bypassing the package cache
        #[arg(long)]
        force: bool,

        /// Only show what would be downloaded
        #[arg(long)]
        dry_run: bool,

        /// Bypass the cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Check each version against the provider before planning
        #[arg(long)]
        verify: bool,
    },

    /// List published versions of a library
    Versions {
        /// Library name
        library: String,

        /// Provider to ask (unpkg, cdnjs, jsdelivr)
        #[arg(long)]
        cdn: Option<String>,

        /// Show at most this many versions
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Fail unless this version is published
        #[arg(long, value_name = "VERSION")]
        check: Option<String>,
    },

    /// Search cdnjs and the npm registry for libraries
    Search {
        /// Search terms
        query: String,

        /// Catalogue to search (all, cdnjs, npm)
        #[arg(long, default_value = "all")]
        cdn: String,

        /// Show at most this many results
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the files of a library version
    Files {
        /// Library name
        library: String,

        /// Library version
        version: String,

        /// Provider to ask (unpkg, cdnjs, jsdelivr)
        #[arg(long)]
        cdn: Option<String>,
    },

    /// Report libraries with a newer release than the manifest pins
    Outdated {
        /// Path to the manifest file
        #[arg(short, long, default_value = MANIFEST_FILE)]
        manifest: PathBuf,
    },

    /// Remove the destination directories of all manifest libraries
    Clean {
        /// Path to the manifest file
        #[arg(short, long, default_value = MANIFEST_FILE)]
        manifest: PathBuf,

        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect and manage the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache location and usage
    Stats,
    /// Remove all cached metadata and packages
    Clear,
    /// Remove cached package files only
    ClearPackages,
    /// Remove expired metadata entries
    Clean,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Sync {
            manifest,
            force,
            dry_run,
            no_cache,
            verify,
        } => commands::sync::run(
            &manifest,
            &commands::sync::SyncFlags {
                force,
                dry_run,
                no_cache,
                verify,
            },
        ),
        Command::Versions {
            library,
            cdn,
            limit,
            check,
        } => commands::versions::run(&library, cdn.as_deref(), limit, check.as_deref()),
        Command::Search {
            query,
            cdn,
            limit,
            json,
        } => commands::search::run(&query, &cdn, limit, json),
        Command::Files {
            library,
            version,
            cdn,
        } => commands::files::run(&library, &version, cdn.as_deref()),
        Command::Outdated { manifest } => commands::outdated::run(&manifest),
        Command::Clean {
            manifest,
            dry_run,
            yes,
        } => commands::clean::run(&manifest, dry_run, yes),
        Command::Cache { action } => match action {
            CacheAction::Stats => commands::cache::stats(),
            CacheAction::Clear => commands::cache::clear(),
            CacheAction::ClearPackages => commands::cache::clear_packages(),
            CacheAction::Clean => commands::cache::clean(),
        },
    }
}
