//! Watch mode: re-analyses the project when analysable files change.
//!
//! Filesystem events are narrowed to add / change / unlink of markup,
//! stylesheet and script files, then coalesced by a [`Debouncer`]: a burst
//! of events yields one pass once the window has been quiet. Passes never
//! overlap; events arriving during a pass are queued for the next one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anatomist::FileKind;
use common::snapshot::SNAPSHOT_FILE;
use common::{Config, SnapshotSlot};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use reaper::Policy;

use crate::{analyse, fix_pass, report};

/// How often the loop wakes to check the debounce window and stop flag.
const POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Add(PathBuf),
    Change(PathBuf),
    Unlink(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Add(p) | WatchEvent::Change(p) | WatchEvent::Unlink(p) => p,
        }
    }

    /// Maps one notify event to zero or more watch events for the paths
    /// `filter` admits.
    pub fn from_notify(event: &Event, filter: &PathFilter) -> Vec<WatchEvent> {
        let make: fn(PathBuf) -> WatchEvent = match event.kind {
            EventKind::Create(_) => WatchEvent::Add,
            EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
            EventKind::Modify(_) => WatchEvent::Change,
            EventKind::Remove(_) => WatchEvent::Unlink,
            _ => return Vec::new(),
        };
        event
            .paths
            .iter()
            .filter(|p| filter.admits(p))
            .cloned()
            .map(make)
            .collect()
    }
}

/// Which event paths can change an analysis result.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    /// deadwatcher's own output directories.
    internal: Vec<PathBuf>,
    excluded_names: Vec<String>,
}

impl PathFilter {
    pub fn new(root: &Path, config: &Config) -> Self {
        let mut internal = vec![config.patches_path(root)];
        if let Some(parent) = root.join(SNAPSHOT_FILE).parent() {
            internal.push(parent.to_path_buf());
        }
        Self {
            root: root.to_path_buf(),
            internal,
            excluded_names: config.exclude_dirs.clone(),
        }
    }

    /// `true` for analysable files outside excluded and internal directories.
    pub fn admits(&self, path: &Path) -> bool {
        if FileKind::from_path(path).is_none() {
            return false;
        }
        if self.internal.iter().any(|dir| path.starts_with(dir)) {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| self.excluded_names.iter().any(|e| e == name))
        })
    }
}

/// Trailing-edge debounce: fires once `window` has passed since the last
/// recorded event.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_event: Option<Instant>,
    coalesced: usize,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_event: None,
            coalesced: 0,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.last_event = Some(now);
        self.coalesced += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    pub fn ready(&self, now: Instant) -> bool {
        self.last_event
            .is_some_and(|last| now.saturating_duration_since(last) >= self.window)
    }

    /// Clears the pending burst and returns how many events it held.
    pub fn take(&mut self) -> usize {
        self.last_event = None;
        std::mem::take(&mut self.coalesced)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Run the remediator after every pass.
    pub fix: Option<Policy>,
    /// Suppress console reports (the TUI owns the terminal).
    pub quiet: bool,
}

/// Runs the initial pass, then re-analyses on change until `stop` is set or
/// the event channel closes.
pub fn run_watch(
    root: &Path,
    config: &Config,
    options: &WatchOptions,
    slot: &SnapshotSlot,
    stop: &Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let root = dunce::canonicalize(root)?;
    let filter = PathFilter::new(&root, config);

    pass(&root, config, options, slot);

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(err) => tracing::warn!(error = %err, "watch error"),
        },
        notify::Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    if !options.quiet {
        println!("Watching {} for changes. Press Ctrl+C to stop.", root.display());
    }

    let mut debouncer = Debouncer::new(Duration::from_millis(config.debounce_ms));
    while !stop.load(Ordering::Relaxed) {
        match rx.recv_timeout(POLL) {
            Ok(event) => {
                for change in WatchEvent::from_notify(&event, &filter) {
                    tracing::debug!(path = %change.path().display(), ?change, "file event");
                    debouncer.record(Instant::now());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if debouncer.ready(Instant::now()) {
                    let events = debouncer.take();
                    tracing::info!(events, "change burst settled; re-analysing");
                    pass(&root, config, options, slot);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::warn!("watch channel disconnected");
                break;
            }
        }
    }
    Ok(())
}

/// One analysis pass plus optional remediation. Failures are logged; the
/// loop keeps watching.
fn pass(root: &Path, config: &Config, options: &WatchOptions, slot: &SnapshotSlot) {
    let scan = match analyse(root, config, slot) {
        Ok(scan) => scan,
        Err(err) => {
            tracing::warn!(error = %err, "analysis pass failed");
            return;
        }
    };
    if !options.quiet {
        report::print_report(&scan.result, &scan.stats);
    }
    if let Some(policy) = options.fix {
        if let Err(err) = fix_pass(&scan, config, policy, options.quiet) {
            tracing::warn!(error = %err, "remediation failed");
        }
    }
}
