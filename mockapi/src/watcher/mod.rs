use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// How long the file must be quiet before a change is reported.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// An event from the file watcher, ready for the Store to reload on.
#[derive(Debug, Clone)]
pub struct WatcherEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Watches a single backing file for changes.
/// Debounced events are sent through an mpsc channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    /// Handle to the background thread processing events
    _thread: std::thread::JoinHandle<()>,
    /// Receiver for debounced file change events
    pub event_rx: mpsc::Receiver<WatcherEvent>,
}

impl FileWatcher {
    /// Start watching `path`.
    ///
    /// The parent directory is watched rather than the file itself, since
    /// editors and atomic writers replace the file by renaming over it.
    pub fn start(path: &Path) -> Result<Self, notify::Error> {
        let target = path
            .canonicalize()
            .map_err(|e| notify::Error::io(e).add_path(path.to_path_buf()))?;
        let file_name = target
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| notify::Error::generic("watched path has no file name"))?;
        let dir = match target.parent() {
            Some(dir) => dir.to_path_buf(),
            None => return Err(notify::Error::generic("watched path has no parent directory")),
        };

        let (notify_tx, notify_rx) = mpsc::channel::<notify::Result<Event>>();
        let (event_tx, event_rx) = mpsc::channel::<WatcherEvent>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let thread = std::thread::spawn(move || {
            debounce_loop(notify_rx, event_tx, target, file_name);
        });

        Ok(FileWatcher {
            _watcher: watcher,
            _thread: thread,
            event_rx,
        })
    }
}

fn debounce_loop(
    notify_rx: mpsc::Receiver<notify::Result<Event>>,
    event_tx: mpsc::Sender<WatcherEvent>,
    target: PathBuf,
    file_name: OsString,
) {
    let mut pending: Option<ChangeKind> = None;
    let mut last_event = Instant::now();

    loop {
        match notify_rx.recv_timeout(DEBOUNCE) {
            Ok(Ok(event)) => {
                let kind = match event.kind {
                    EventKind::Create(_) => Some(ChangeKind::Created),
                    EventKind::Modify(_) => Some(ChangeKind::Modified),
                    EventKind::Remove(_) => Some(ChangeKind::Deleted),
                    _ => None,
                };
                let touches_target = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()));

                if let (Some(kind), true) = (kind, touches_target) {
                    // keep the latest kind for the burst
                    pending = Some(kind);
                    last_event = Instant::now();
                }
            }
            Ok(Err(e)) => {
                log::warn!("File watcher error: {e}");
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if last_event.elapsed() >= DEBOUNCE {
                    if let Some(kind) = pending.take() {
                        let event = WatcherEvent {
                            path: target.clone(),
                            kind,
                        };
                        if event_tx.send(event).is_err() {
                            return; // Receiver dropped
                        }
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// The kind of file change detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}
