//! Files command implementation.

use super::{open_session, provider_arg};
use indicatif::HumanBytes;
use std::process::ExitCode;

pub fn run(library: &str, version: &str, cdn: Option<&str>) -> ExitCode {
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

    let files = match provider
        .adapter()
        .fetch_file_list(&session.ctx(), library, version)
    {
        Ok(files) => files,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if files.is_empty() {
        println!("{library}@{version} on {provider} has no files");
        return ExitCode::SUCCESS;
    }

    let total: u64 = files.iter().map(|f| f.size).sum();
    for file in &files {
        let size = if file.size > 0 {
            HumanBytes(file.size).to_string()
        } else {
            "-".to_string()
        };
        match &file.integrity {
            Some(integrity) => println!("  {:<50} {:>10}  {integrity}", file.path, size),
            None => println!("  {:<50} {:>10}", file.path, size),
        }
    }

    print!("\n{} file(s)", files.len());
    if total > 0 {
        print!(", {}", HumanBytes(total));
    }
    println!();

    ExitCode::SUCCESS
}
