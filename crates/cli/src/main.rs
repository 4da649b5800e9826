use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anatomist::pipeline::{self, removal_candidates, ScanResult};
use common::snapshot::{self, snapshot_path};
use common::{Config, RunStamp, SnapshotSlot};
use reaper::{ConsoleDecisions, DecisionProvider, Policy, Remediator, RevertOutcome, ScriptedDecisions};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod report;
mod watch;

#[derive(Parser)]
#[command(name = "deadwatcher")]
#[command(
    about = "Finds unused CSS classes, deprecated HTML tags and unused JS functions, and removes them safely",
    long_about = None
)]
struct Cli {
    /// Log progress (info level) to stderr. `RUST_LOG` overrides.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis pass and print the report.
    Scan {
        /// Project root to analyse.
        path: PathBuf,
        /// Print the result as JSON instead of the console report.
        #[arg(long)]
        json: bool,
    },
    /// Analyse, then re-analyse whenever a markup, stylesheet or script file changes.
    Watch {
        path: PathBuf,
        /// Show the live terminal dashboard instead of console reports.
        #[arg(long)]
        dashboard: bool,
        /// Remediate after every pass: interactive, apply-all or patch-only.
        #[arg(long, value_name = "POLICY")]
        fix: Option<Policy>,
    },
    /// Analyse, then remove dead code (interactive unless a flag says otherwise).
    Fix {
        path: PathBuf,
        /// Apply every removal without asking.
        #[arg(long, conflicts_with = "patch_only")]
        apply_all: bool,
        /// Write diff files to the patch directory; touch no source file.
        #[arg(long)]
        patch_only: bool,
    },
    /// Restore backups taken by a fix run.
    Revert {
        path: PathBuf,
        /// Run timestamp (unix millis) or `all`.
        timestamp: String,
    },
    /// Launch the terminal dashboard over the last saved scan.
    Dashboard {
        /// Project root (reads .deadwatcher/last-result.json).
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: .env: {}", e);
        }
    }

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Scan { path, json } => cmd_scan(path, *json)?,
        Commands::Watch {
            path,
            dashboard,
            fix,
        } => cmd_watch(path, *dashboard, *fix)?,
        Commands::Fix {
            path,
            apply_all,
            patch_only,
        } => cmd_fix(path, *apply_all, *patch_only)?,
        Commands::Revert { path, timestamp } => cmd_revert(path, timestamp),
        Commands::Dashboard { path } => cmd_dashboard(path)?,
    }

    Ok(())
}

/// stderr subscriber; `RUST_LOG` wins, else `info` with `--verbose`, else `warn`.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

// ---------------------------------------------------------------------------
// Shared pass helpers
// ---------------------------------------------------------------------------

/// One analysis pass: publishes the result to `slot` and persists it for the
/// `dashboard` command.
pub(crate) fn analyse(root: &Path, config: &Config, slot: &SnapshotSlot) -> anyhow::Result<ScanResult> {
    let stamp = RunStamp::now();
    let scan = pipeline::run(root, config)?;
    slot.publish(scan.result.clone(), stamp.to_string());

    let path = snapshot_path(&scan.files.root);
    if let Err(err) = snapshot::save(&slot.current(), &path) {
        tracing::warn!(path = %path.display(), error = %err, "could not save snapshot");
    }
    Ok(scan)
}

/// Remediates one scan under `policy` with its own run stamp.
pub(crate) fn fix_pass(scan: &ScanResult, config: &Config, policy: Policy, quiet: bool) -> anyhow::Result<()> {
    let candidates = removal_candidates(scan, config)?;
    let stamp = RunStamp::now();
    let remediator = Remediator::new(&scan.files.root, config, stamp.clone());

    let mut decisions: Box<dyn DecisionProvider> = match policy {
        Policy::Interactive => Box::new(ConsoleDecisions::stdio()),
        Policy::ApplyAll | Policy::PatchOnly => Box::new(ScriptedDecisions::default()),
    };
    let outcome = remediator.run(scan, &candidates, policy, decisions.as_mut())?;

    if !quiet {
        report::print_remediation(&outcome, &stamp, policy, &scan.files.root);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn cmd_scan(project_root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(project_root)?;
    let scan = analyse(project_root, &config, &SnapshotSlot::new())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scan.result)?);
    } else {
        report::print_report(&scan.result, &scan.stats);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

fn cmd_watch(project_root: &Path, dashboard: bool, fix: Option<Policy>) -> anyhow::Result<()> {
    if dashboard && fix == Some(Policy::Interactive) {
        anyhow::bail!("--fix interactive needs the terminal; use apply-all or patch-only with --dashboard");
    }
    let config = Config::load(project_root)?;
    let slot = SnapshotSlot::new();
    let stop = Arc::new(AtomicBool::new(false));
    let options = watch::WatchOptions {
        fix,
        quiet: dashboard,
    };

    if !dashboard {
        return watch::run_watch(project_root, &config, &options, &slot, &stop);
    }

    let worker = {
        let (root, slot, stop) = (project_root.to_path_buf(), slot.clone(), Arc::clone(&stop));
        std::thread::spawn(move || watch::run_watch(&root, &config, &options, &slot, &stop))
    };

    let tui = dashboard::draw_dashboard(&slot).map_err(|e| anyhow::anyhow!("TUI error: {}", e));
    stop.store(true, Ordering::Relaxed);
    let watched = worker
        .join()
        .map_err(|_| anyhow::anyhow!("watch worker panicked"))?;
    tui?;
    watched
}

// ---------------------------------------------------------------------------
// fix
// ---------------------------------------------------------------------------

fn cmd_fix(project_root: &Path, apply_all: bool, patch_only: bool) -> anyhow::Result<()> {
    let config = Config::load(project_root)?;
    let scan = analyse(project_root, &config, &SnapshotSlot::new())?;
    report::print_report(&scan.result, &scan.stats);

    let policy = if patch_only {
        Policy::PatchOnly
    } else if apply_all {
        Policy::ApplyAll
    } else {
        Policy::Interactive
    };
    fix_pass(&scan, &config, policy, false)
}

// ---------------------------------------------------------------------------
// revert
// ---------------------------------------------------------------------------

/// Exits with status 1 when no backup matches.
fn cmd_revert(project_root: &Path, timestamp: &str) {
    let outcome = reaper::revert(project_root, timestamp);
    print!("{}", report::render_revert(&outcome, project_root));
    if let RevertOutcome::Miss { .. } = outcome {
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// dashboard
// ---------------------------------------------------------------------------

fn cmd_dashboard(project_root: &Path) -> anyhow::Result<()> {
    let root = dunce::canonicalize(project_root)?;
    let path = snapshot_path(&root);
    if !path.exists() {
        println!(
            "No saved scan found. Run `deadwatcher scan {}` first.",
            project_root.display()
        );
        return Ok(());
    }
    let slot = SnapshotSlot::with_snapshot(snapshot::load(&path)?);
    dashboard::draw_dashboard(&slot).map_err(|e| anyhow::anyhow!("TUI error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fix_flags_conflict() {
        let parsed = Cli::try_parse_from(["deadwatcher", "fix", ".", "--apply-all", "--patch-only"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_watch_policy_parsed() {
        let cli = Cli::try_parse_from(["deadwatcher", "watch", "site", "--fix", "patch-only"]).unwrap();
        let Commands::Watch { fix, dashboard, .. } = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(fix, Some(Policy::PatchOnly));
        assert!(!dashboard);
        assert!(Cli::try_parse_from(["deadwatcher", "watch", "site", "--fix", "sometimes"]).is_err());
    }

    #[test]
    fn test_analyse_publishes_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("site.css"), ".lonely {}\n").unwrap();
        let slot = SnapshotSlot::new();

        let scan = analyse(tmp.path(), &Config::default(), &slot).unwrap();
        assert_eq!(slot.generation(), 1);
        assert_eq!(slot.current().result.unused_classes, vec!["lonely"]);

        let saved = snapshot::load(&snapshot_path(&scan.files.root)).unwrap();
        assert_eq!(saved.result, scan.result);
    }

    #[test]
    fn test_fix_pass_patch_only_writes_patches() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("site.css"), ".lonely {}\n.kept {}\n").unwrap();
        std::fs::write(tmp.path().join("index.html"), "<p class=\"kept\"></p>").unwrap();
        let config = Config::default();
        let scan = analyse(tmp.path(), &config, &SnapshotSlot::new()).unwrap();

        fix_pass(&scan, &config, Policy::PatchOnly, true).unwrap();
        let patches = config.patches_path(&scan.files.root);
        assert!(std::fs::read_dir(&patches).unwrap().count() >= 2);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("site.css")).unwrap(),
            ".lonely {}\n.kept {}\n"
        );
    }
}
