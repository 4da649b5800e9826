//! End-to-end remediation scenarios over scratch project trees.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anatomist::pipeline::{self, removal_candidates, ScanResult};
use anatomist::ParserHost;
use common::{Config, RunStamp};
use reaper::remediate::RemediationReport;
use reaper::{
    revert, ClassDecision, FunctionDecision, PatchGenerator, Policy, Remediator, RevertOutcome,
    ScriptedDecisions,
};

fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    tmp
}

fn scan(root: &Path, config: &Config) -> ScanResult {
    pipeline::run(root, config).unwrap()
}

fn stamp(millis: i64) -> RunStamp {
    RunStamp::from_millis(millis).unwrap()
}

fn remediate(root: &Path, policy: Policy, millis: i64) -> (ScanResult, RemediationReport) {
    remediate_with(root, policy, millis, &mut ScriptedDecisions::default())
}

fn remediate_with(
    root: &Path,
    policy: Policy,
    millis: i64,
    decisions: &mut ScriptedDecisions,
) -> (ScanResult, RemediationReport) {
    let config = Config::default();
    let scan = scan(root, &config);
    let candidates = removal_candidates(&scan, &config).unwrap();
    let remediator = Remediator::new(&scan.files.root, &config, stamp(millis));
    let report = remediator.run(&scan, &candidates, policy, decisions).unwrap();
    (scan, report)
}

fn restored_set(outcome: &RevertOutcome) -> BTreeSet<PathBuf> {
    match outcome {
        RevertOutcome::Restored { restored } => {
            restored.iter().map(|r| r.restored_to.clone()).collect()
        }
        RevertOutcome::Miss { .. } => BTreeSet::new(),
    }
}

/// Every script under `root` still parses cleanly.
fn assert_scripts_parse(root: &Path) {
    let mut host = ParserHost::new().unwrap();
    let scripts = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "js"));
    for entry in scripts {
        let source = fs::read_to_string(entry.path()).unwrap();
        let tree = host.parse_script(&source).unwrap();
        assert!(
            !tree.root_node().has_error(),
            "{} no longer parses:\n{source}",
            entry.path().display()
        );
    }
}

const SITE: &[(&str, &str)] = &[
    ("css/site.css", ".foo { color: red; }\n.bar { color: blue; }\n.foo, .bar { margin: 0; }\n"),
    ("index.html", "<div class=\"foo\"><center>hi</center></div>\n<script src=\"app.js\"></script>\n"),
    ("app.js", "function helper() {\n  return 42;\n}\n\nfunction main() {\n  return 1;\n}\nmain();\n"),
];

#[test]
fn test_unused_class_and_deprecated_tag_reported() {
    let tmp = project(SITE);
    let scan = scan(tmp.path(), &Config::default());
    assert_eq!(scan.result.unused_classes, vec!["bar"]);
    assert_eq!(scan.result.deprecated_tags, vec!["center"]);
    let unused: Vec<&str> = scan.result.js_unused.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(unused, vec!["helper"]);
}

#[test]
fn test_apply_all_comments_helper_and_strips_bar() {
    let tmp = project(SITE);
    let (scan, report) = remediate(tmp.path(), Policy::ApplyAll, 1_700_000_000_000);
    let root = &scan.files.root;

    let js = fs::read_to_string(root.join("app.js")).unwrap();
    assert!(js.starts_with("/* DEADWATCHER REMOVED FUNCTION: helper - 2023-11-14T22:13:20.000Z */\n"));
    assert!(js.contains("// ORIGINAL (kept commented):\n// function helper() {\n"));
    assert!(js.contains("\nfunction main() {\n"));

    let css = fs::read_to_string(root.join("css/site.css")).unwrap();
    assert_eq!(css, ".foo { color: red; }\n.foo { margin: 0; }\n");

    assert_scripts_parse(root);

    assert_eq!(report.changed_files.len(), 2);
    assert_eq!(report.backups, 2);
    assert!(root.join("app.js.bak.1700000000000").exists());
    assert!(root.join("css/site.css.bak.1700000000000").exists());
}

#[test]
fn test_ignore_pattern_keeps_class_out_of_removal() {
    let tmp = project(&[("site.css", ".btn-primary {}\n.stale {}\n")]);
    let mut config = Config::default();
    config.ignore_classes.extend(["btn-*"]);
    let scan = scan(tmp.path(), &config);
    assert_eq!(scan.result.unused_classes, vec!["stale"]);
}

#[test]
fn test_patch_only_leaves_sources_untouched() {
    let tmp = project(SITE);
    let before: Vec<String> = SITE.iter().map(|(_, c)| c.to_string()).collect();
    let (scan, report) = remediate(tmp.path(), Policy::PatchOnly, 1_700_000_000_000);
    let root = &scan.files.root;

    for ((rel, _), original) in SITE.iter().zip(&before) {
        assert_eq!(&fs::read_to_string(root.join(rel)).unwrap(), original);
    }
    assert!(report.changed_files.is_empty());
    assert_eq!(report.patches.patches.len(), 2);

    let patches = root.join("deadwatcher_patches");
    let css_patch = fs::read_to_string(patches.join("1700000000000_site.css.diff")).unwrap();
    assert!(css_patch.starts_with("*** css/site.css\n--- css/site.css\n"));
    assert!(css_patch.contains("\n-.bar { color: blue; }\n"));

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(patches.join("suggested-changes.1700000000000.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["timestamp"], "1700000000000");
    let kinds: Vec<&str> = manifest["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["css-class-removal", "js-comment-func"]);

    // No backups under patch-only.
    assert!(!root.join("app.js.bak.1700000000000").exists());
}

#[test]
fn test_patch_generation_is_idempotent() {
    let tmp = project(SITE);
    let config = Config::default();
    let scan = scan(tmp.path(), &config);
    let candidates = removal_candidates(&scan, &config).unwrap();

    let (first, second) = (stamp(1_000), stamp(2_000));
    let a = PatchGenerator::new(&scan.files.root, &config, first.clone())
        .generate(&scan, &candidates)
        .unwrap();
    let b = PatchGenerator::new(&scan.files.root, &config, second.clone())
        .generate(&scan, &candidates)
        .unwrap();

    assert_eq!(a.patches.len(), b.patches.len());
    for (pa, pb) in a.patches.iter().zip(&b.patches) {
        let da = fs::read_to_string(pa).unwrap();
        let db = fs::read_to_string(pb).unwrap().replace(&second.iso, &first.iso);
        assert_eq!(da, db);
    }
    assert_scripts_parse(&scan.files.root);
}

#[test]
fn test_revert_round_trip_is_byte_identical() {
    let tmp = project(SITE);
    let originals: Vec<Vec<u8>> = SITE
        .iter()
        .map(|(rel, _)| fs::read(tmp.path().join(rel)).unwrap())
        .collect();

    remediate(tmp.path(), Policy::ApplyAll, 1_700_000_000_000);
    let outcome = revert(tmp.path(), "1700000000000");
    assert_eq!(restored_set(&outcome).len(), 2);

    for ((rel, _), original) in SITE.iter().zip(&originals) {
        assert_eq!(&fs::read(tmp.path().join(rel)).unwrap(), original, "{rel}");
    }

    // Second revert of the same stamp lands on the same state.
    let again = revert(tmp.path(), "1700000000000");
    assert_eq!(restored_set(&again), restored_set(&outcome));
    for ((rel, _), original) in SITE.iter().zip(&originals) {
        assert_eq!(&fs::read(tmp.path().join(rel)).unwrap(), original);
    }
}

#[test]
fn test_revert_all_is_superset_of_each_run() {
    let tmp = project(SITE);
    remediate(tmp.path(), Policy::ApplyAll, 1_000);
    fs::write(tmp.path().join("extra.css"), ".orphan { top: 0; }\n").unwrap();
    remediate(tmp.path(), Policy::ApplyAll, 2_000);

    let first = restored_set(&revert(tmp.path(), "1000"));
    let second = restored_set(&revert(tmp.path(), "2000"));
    let all = restored_set(&revert(tmp.path(), "all"));

    assert!(!first.is_empty());
    assert!(!second.is_empty());
    assert!(first.is_subset(&all));
    assert!(second.is_subset(&all));
}

#[test]
fn test_interactive_decisions_are_honoured() {
    let tmp = project(&[
        ("site.css", ".a {}\n.b {}\n.c {}\n"),
        ("app.js", "function one() {}\nfunction two() {}\n"),
    ]);
    let mut decisions = ScriptedDecisions::new(
        [ClassDecision::Skip, ClassDecision::Process, ClassDecision::SkipAll],
        [FunctionDecision::Keep, FunctionDecision::Comment],
    );
    let (scan, report) = remediate_with(tmp.path(), Policy::Interactive, 5_000, &mut decisions);
    let root = &scan.files.root;

    assert_eq!(fs::read_to_string(root.join("site.css")).unwrap(), ".a {}\n.c {}\n");
    let js = fs::read_to_string(root.join("app.js")).unwrap();
    assert!(js.starts_with("function one() {}\n"));
    assert!(js.contains("DEADWATCHER REMOVED FUNCTION: two"));

    assert_scripts_parse(root);

    assert_eq!(report.classes_removed, vec!["b"]);
    assert_eq!(report.functions_commented, vec!["app.js::two"]);
    assert_eq!(decisions.excerpts.len(), 2);
    assert!(decisions.excerpts[0].starts_with("1: function one() {}"));
}

#[test]
fn test_unsafe_function_is_never_touched() {
    let tmp = project(&[
        ("app.js", "function onSubmit() {}\n"),
        ("routes.json", "{ \"handler\": \"onSubmit\" }\n"),
    ]);
    let (scan, report) = remediate(tmp.path(), Policy::ApplyAll, 3_000);
    assert_eq!(scan.result.js_unused.len(), 1);
    assert!(report.changed_files.is_empty());
    assert_eq!(
        fs::read_to_string(scan.files.root.join("app.js")).unwrap(),
        "function onSubmit() {}\n"
    );
}

#[test]
fn test_apply_all_keeps_every_declaration_form_parseable() {
    let source = "export const format = () => 'x';\n\
                  var gen = function* () { yield 1; };\n\
                  let dead = function () { return 1; }, live = 2;\n\
                  console.log(live);\n";
    let tmp = project(&[("app.js", source)]);
    let (scan, report) = remediate(tmp.path(), Policy::ApplyAll, 4_000);
    let root = &scan.files.root;

    let unused: BTreeSet<&str> = scan.result.js_unused.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(unused, BTreeSet::from(["format", "gen"]));

    let js = fs::read_to_string(root.join("app.js")).unwrap();
    assert!(js.contains("DEADWATCHER REMOVED FUNCTION: format"));
    assert!(js.contains("DEADWATCHER REMOVED FUNCTION: gen"));
    assert!(js.contains("\nlet dead = function () { return 1; }, live = 2;\n"));
    assert_eq!(report.functions_commented.len(), 2);
    assert_scripts_parse(root);
}

#[test]
fn test_multi_declarator_file_is_left_alone() {
    let source = "let dead = function () { return 1; }, live = 2;\nconsole.log(live);\n";
    let tmp = project(&[("app.js", source)]);
    let (scan, report) = remediate(tmp.path(), Policy::ApplyAll, 6_000);

    assert!(scan.result.js_unused.is_empty());
    assert!(report.changed_files.is_empty());
    assert_eq!(fs::read_to_string(scan.files.root.join("app.js")).unwrap(), source);
    assert_scripts_parse(&scan.files.root);
}
