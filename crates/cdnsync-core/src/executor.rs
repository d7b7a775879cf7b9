//! Sequential download of planned tasks.

use crate::http::FetchError;
use crate::model::DownloadTask;
use crate::provider::FetchContext;
use cdnsync_store::{PackageKey, partial_path};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 8192;

/// Progress events, in order: one `Started`, any number of `Transferred`,
/// one `Finished` per task.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    Started {
        task: &'a DownloadTask,
        index: usize,
        total: usize,
    },
    /// Cumulative bytes written for the current task.
    Transferred {
        task: &'a DownloadTask,
        bytes: u64,
        /// Content-Length, falling back to the planned size.
        expected: Option<u64>,
    },
    Finished {
        task: &'a DownloadTask,
        bytes: u64,
        from_cache: bool,
    },
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Tasks materialized, including cache restores.
    pub completed: usize,
    /// Tasks restored from the package tier.
    pub from_cache: usize,
    /// Bytes written to destinations.
    pub bytes: u64,
    /// The batch stopped early because cancellation was requested.
    pub cancelled: bool,
}

/// How a batch treats the package tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Skip package-tier restores and fetch every file again. The fresh
    /// download replaces the cached copy.
    pub refresh: bool,
}

/// Errors that abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("failed to download {library}/{path}: {source}")]
    Fetch {
        library: String,
        path: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn package_key(task: &DownloadTask) -> PackageKey {
    PackageKey::new(
        task.provider.id(),
        &task.library,
        &task.version,
        &task.remote_path,
    )
}

/// Materialize `tasks` in order.
///
/// Files already in the package tier are copied from there unless
/// `options.refresh` is set; everything else is fetched with one GET and
/// streamed to disk. The first failure aborts the batch. `cancel` is checked
/// before each task.
pub fn execute<F>(
    tasks: &[DownloadTask],
    ctx: &FetchContext<'_>,
    options: &ExecuteOptions,
    cancel: &AtomicBool,
    mut on_progress: F,
) -> Result<ExecutionReport, ExecuteError>
where
    F: FnMut(Progress<'_>),
{
    let mut report = ExecutionReport::default();
    let total = tasks.len();

    for (index, task) in tasks.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            info!(
                completed = report.completed,
                remaining = total - index,
                "sync cancelled"
            );
            report.cancelled = true;
            break;
        }

        on_progress(Progress::Started { task, index, total });

        let key = package_key(task);
        let restored = if options.refresh {
            None
        } else {
            restore_from_cache(ctx, &key, task)
        };
        if let Some(bytes) = restored {
            report.completed += 1;
            report.from_cache += 1;
            report.bytes += bytes;
            on_progress(Progress::Finished {
                task,
                bytes,
                from_cache: true,
            });
            continue;
        }

        let bytes = download(ctx, task, &mut on_progress)?;

        if let Err(e) = ctx.cache.put_package_from(&key, &task.local_path) {
            warn!(key = %key, error = %e, "failed to cache package file");
        }

        report.completed += 1;
        report.bytes += bytes;
        on_progress(Progress::Finished {
            task,
            bytes,
            from_cache: false,
        });
    }

    info!(
        completed = report.completed,
        from_cache = report.from_cache,
        bytes = report.bytes,
        "sync finished"
    );
    Ok(report)
}

fn restore_from_cache(ctx: &FetchContext<'_>, key: &PackageKey, task: &DownloadTask) -> Option<u64> {
    match ctx.cache.restore_package(key, &task.local_path) {
        Ok(Some(bytes)) => {
            debug!(key = %key, dest = %task.local_path.display(), "restored from package cache");
            Some(bytes)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(key = %key, error = %e, "package cache restore failed, downloading");
            None
        }
    }
}

fn download<F>(
    ctx: &FetchContext<'_>,
    task: &DownloadTask,
    on_progress: &mut F,
) -> Result<u64, ExecuteError>
where
    F: FnMut(Progress<'_>),
{
    let fetch_error = |source: FetchError| ExecuteError::Fetch {
        library: task.library.clone(),
        path: task.remote_path.clone(),
        source,
    };
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ExecuteError::Io { path, source }
    };

    debug!(url = %task.url, dest = %task.local_path.display(), "downloading");
    let mut response = ctx.http.get(&task.url).map_err(fetch_error)?;
    let expected = response
        .content_length
        .or((task.size > 0).then_some(task.size));

    if let Some(parent) = task.local_path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let partial = partial_path(&task.local_path);
    let mut file = File::create(&partial).map_err(io_error(&partial))?;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut written: u64 = 0;

    let result = loop {
        let n = match response.body.read(&mut buf) {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                break Err(fetch_error(FetchError::Body {
                    url: task.url.clone(),
                    source,
                }));
            }
        };
        if let Err(e) = file.write_all(&buf[..n]) {
            break Err(io_error(&partial)(e));
        }
        written += n as u64;
        on_progress(Progress::Transferred {
            task,
            bytes: written,
            expected,
        });
    };

    let result = result.and_then(|()| file.flush().map_err(io_error(&partial)));
    drop(file);
    let result = result.and_then(|()| {
        fs::rename(&partial, &task.local_path).map_err(io_error(&task.local_path))
    });

    if let Err(e) = result {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    debug!(dest = %task.local_path.display(), bytes = written, "downloaded");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::MockClient;
    use crate::model::Provider;
    use crate::provider::tests::with_ctx;
    use cdnsync_store::{CacheStore, DEFAULT_TTL};
    use tempfile::TempDir;

    fn task(dir: &Path, name: &str, url: &str) -> DownloadTask {
        DownloadTask {
            library: "lib".to_string(),
            version: "1.0.0".to_string(),
            provider: Provider::Unpkg,
            remote_path: format!("dist/{name}"),
            local_path: dir.join("vendor/lib/dist").join(name),
            url: url.to_string(),
            size: 0,
        }
    }

    #[test]
    fn downloads_in_order_and_reports_bytes() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::disabled();
        let big = vec![7u8; CHUNK_SIZE * 2 + 100];
        let client = MockClient::new()
            .with_body("https://cdn.test/a.js", "alpha")
            .with_body("https://cdn.test/b.js", big.clone());
        let tasks = vec![
            task(temp.path(), "a.js", "https://cdn.test/a.js"),
            task(temp.path(), "b.js", "https://cdn.test/b.js"),
        ];

        let mut events = Vec::new();
        let cancel = AtomicBool::new(false);
        let report = with_ctx(&client, &cache, |ctx| {
            execute(&tasks, ctx, &ExecuteOptions::default(), &cancel, |p| {
                events.push(match p {
                    Progress::Started { index, .. } => format!("start {index}"),
                    Progress::Transferred { bytes, .. } => format!("bytes {bytes}"),
                    Progress::Finished { bytes, .. } => format!("done {bytes}"),
                })
            })
        })
        .unwrap();

        assert_eq!(report.completed, 2);
        assert_eq!(report.bytes, 5 + big.len() as u64);
        assert!(!report.cancelled);
        assert_eq!(fs::read(&tasks[0].local_path).unwrap(), b"alpha");
        assert_eq!(fs::read(&tasks[1].local_path).unwrap(), big);
        assert_eq!(client.calls(), vec!["https://cdn.test/a.js", "https://cdn.test/b.js"]);

        assert_eq!(events[0], "start 0");
        assert_eq!(events[1], "bytes 5");
        assert_eq!(events[2], "done 5");
        assert_eq!(events[3], "start 1");
        assert_eq!(events.last().unwrap(), &format!("done {}", big.len()));
    }

    #[test]
    fn first_failure_aborts_batch() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::disabled();
        let client = MockClient::new()
            .with_status("https://cdn.test/a.js", 500)
            .with_body("https://cdn.test/b.js", "beta");
        let tasks = vec![
            task(temp.path(), "a.js", "https://cdn.test/a.js"),
            task(temp.path(), "b.js", "https://cdn.test/b.js"),
        ];

        let cancel = AtomicBool::new(false);
        let options = ExecuteOptions::default();
        let err = with_ctx(&client, &cache, |ctx| execute(&tasks, ctx, &options, &cancel, |_| {}))
            .unwrap_err();

        match err {
            ExecuteError::Fetch { path, source, .. } => {
                assert_eq!(path, "dist/a.js");
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
        assert_eq!(client.calls().len(), 1);
        assert!(!tasks[0].local_path.exists());
        assert!(!partial_path(&tasks[0].local_path).exists());
        assert!(!tasks[1].local_path.exists());
    }

    #[test]
    fn cancellation_stops_before_next_task() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::disabled();
        let client = MockClient::new()
            .with_body("https://cdn.test/a.js", "alpha")
            .with_body("https://cdn.test/b.js", "beta");
        let tasks = vec![
            task(temp.path(), "a.js", "https://cdn.test/a.js"),
            task(temp.path(), "b.js", "https://cdn.test/b.js"),
        ];

        let cancel = AtomicBool::new(false);
        let report = with_ctx(&client, &cache, |ctx| {
            execute(&tasks, ctx, &ExecuteOptions::default(), &cancel, |p| {
                if let Progress::Finished { .. } = p {
                    cancel.store(true, Ordering::SeqCst);
                }
            })
        })
        .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.completed, 1);
        assert!(tasks[0].local_path.exists());
        assert!(!tasks[1].local_path.exists());
    }

    #[test]
    fn package_tier_is_reused() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::with_root(temp.path().join("cache"), DEFAULT_TTL).unwrap();
        let client = MockClient::new().with_body("https://cdn.test/a.js", "alpha");
        let first = vec![task(&temp.path().join("one"), "a.js", "https://cdn.test/a.js")];
        let second = vec![task(&temp.path().join("two"), "a.js", "https://cdn.test/a.js")];
        let options = ExecuteOptions::default();
        let cancel = AtomicBool::new(false);

        let downloaded =
            with_ctx(&client, &cache, |ctx| execute(&first, ctx, &options, &cancel, |_| {})).unwrap();
        assert_eq!(downloaded.from_cache, 0);

        let restored =
            with_ctx(&client, &cache, |ctx| execute(&second, ctx, &options, &cancel, |_| {})).unwrap();
        assert_eq!(restored.from_cache, 1);
        assert_eq!(restored.bytes, 5);
        assert_eq!(fs::read(&second[0].local_path).unwrap(), b"alpha");
        assert_eq!(client.call_count("https://cdn.test/a.js"), 1);
    }

    #[test]
    fn refresh_bypasses_package_tier() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::with_root(temp.path().join("cache"), DEFAULT_TTL).unwrap();
        let tasks = vec![task(temp.path(), "a.js", "https://cdn.test/a.js")];
        let cancel = AtomicBool::new(false);

        let old = MockClient::new().with_body("https://cdn.test/a.js", "old build");
        with_ctx(&old, &cache, |ctx| {
            execute(&tasks, ctx, &ExecuteOptions::default(), &cancel, |_| {})
        })
        .unwrap();

        let new = MockClient::new().with_body("https://cdn.test/a.js", "new build");
        let refresh = ExecuteOptions { refresh: true };
        let report =
            with_ctx(&new, &cache, |ctx| execute(&tasks, ctx, &refresh, &cancel, |_| {})).unwrap();

        assert_eq!(report.from_cache, 0);
        assert_eq!(new.call_count("https://cdn.test/a.js"), 1);
        assert_eq!(fs::read(&tasks[0].local_path).unwrap(), b"new build");
        assert_eq!(
            cache.get_package(&package_key(&tasks[0])).unwrap().as_deref(),
            Some(&b"new build"[..])
        );
    }
}
