//! Sync command implementation.

use super::open_session;
use cdnsync_core::{ExecuteOptions, LocalFs, Manifest, PlanOptions, Progress, execute, plan};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

pub struct SyncFlags {
    pub force: bool,
    pub dry_run: bool,
    pub no_cache: bool,
    pub verify: bool,
}

pub fn run(path: &Path, flags: &SyncFlags) -> ExitCode {
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

    let Some(session) = open_session(flags.no_cache) else {
        return ExitCode::FAILURE;
    };
    let ctx = session.ctx();

    let options = PlanOptions {
        force: flags.force,
        verify_versions: flags.verify,
    };
    let tasks = match plan(&manifest, &ctx, &LocalFs, &options) {
        Ok(tasks) => tasks,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if tasks.is_empty() {
        println!("all libraries up to date");
        return ExitCode::SUCCESS;
    }

    if flags.dry_run {
        for task in &tasks {
            println!(
                "would download: {}@{} {} -> {}",
                task.library,
                task.version,
                task.remote_path,
                task.local_path.display()
            );
        }
        println!("\n{} file(s) to download", tasks.len());
        return ExitCode::SUCCESS;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let bar = ProgressBar::new(tasks.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let execute_options = ExecuteOptions {
        refresh: flags.force,
    };
    let result = execute(&tasks, &ctx, &execute_options, &cancel, |progress| match progress {
        Progress::Started { task, .. } => {
            bar.set_message(format!("{}/{}", task.library, task.remote_path));
        }
        Progress::Transferred { task, bytes, .. } => {
            bar.set_message(format!(
                "{}/{} {}",
                task.library,
                task.remote_path,
                HumanBytes(bytes)
            ));
        }
        Progress::Finished { .. } => bar.inc(1),
    });
    bar.finish_and_clear();

    match result {
        Ok(report) => {
            println!(
                "synced {} file(s), {} ({} from cache)",
                report.completed,
                HumanBytes(report.bytes),
                report.from_cache
            );
            if report.cancelled {
                println!("cancelled; {} file(s) left", tasks.len() - report.completed);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
