use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::AppError;

/// Files under the git dir whose change means the status pane is out of date.
const WATCHED_NAMES: [&str; 2] = ["index", "HEAD"];

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| WATCHED_NAMES.contains(&n))
    })
}

/// Sends `signal()` whenever the index or HEAD changes, at most once per `debounce`.
///
/// Dropping the returned watcher stops it.
pub fn watch_git_dir<T, F>(
    git_dir: &Path,
    debounce: Duration,
    tx: UnboundedSender<T>,
    signal: F,
) -> Result<RecommendedWatcher, AppError>
where
    T: Send + 'static,
    F: Fn() -> T + Send + 'static,
{
    let git_dir: PathBuf = git_dir.to_path_buf();
    let last_event: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        let event = match res {
            Ok(e) => e,
            Err(e) => {
                warn!(err = %e, "Watch error");
                return;
            }
        };
        if !is_relevant(&event) {
            return;
        }

        {
            let mut last = last_event.lock();
            let now = Instant::now();
            if last.is_some_and(|at| now.duration_since(at) < debounce) {
                return;
            }
            *last = Some(now);
        }

        debug!(paths = ?event.paths, "Git state changed");
        let _ = tx.send(signal());
    })
    .map_err(|e| AppError::Watcher(e.to_string()))?;

    watcher
        .watch(&git_dir, RecursiveMode::NonRecursive)
        .map_err(|e| AppError::Watcher(e.to_string()))?;

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn index_and_head_changes_are_relevant() {
        assert!(is_relevant(&event(
            EventKind::Modify(ModifyKind::Any),
            "/r/.git/index"
        )));
        assert!(is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/r/.git/HEAD"
        )));
    }

    #[test]
    fn lock_files_and_access_are_ignored() {
        assert!(!is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/r/.git/index.lock"
        )));
        assert!(!is_relevant(&event(
            EventKind::Access(notify::event::AccessKind::Any),
            "/r/.git/index"
        )));
    }
}
