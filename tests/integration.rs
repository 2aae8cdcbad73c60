mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use common::{default_videos, record_json, write_config, write_partition, FakeVideo, FakeYouTube};

fn capt_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("capt");
    path
}

/// Config pointing at a port nothing listens on; enough for offline commands.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "http://127.0.0.1:1", "http://127.0.0.1:1", "");
    (tmp, config_path)
}

fn setup_with_fake(videos: Vec<common::FakeVideo>, extra: &str) -> (TempDir, PathBuf, FakeYouTube) {
    let fake = FakeYouTube::start(videos);
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), &fake.api_base_url(), &fake.base_url, extra);
    (tmp, config_path, fake)
}

fn run_capt(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = capt_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run capt binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn seed_archive(root: &Path) {
    write_partition(
        root,
        2023,
        serde_json::json!({
            "arch1": record_json(
                "arch1",
                "Vitamin D deep dive",
                "2023-04-01T09:00:00Z",
                &["sunlight matters", "and vitamin D", "is made in skin", "end"],
            ),
            "arch2": record_json("arch2", "Unrelated", "2023-05-01T09:00:00Z", &["protein"]),
        }),
    );
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_capt(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/captions.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_capt(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_capt(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_capt(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();

    run_capt(&config_path, &["init"]);
    let (stdout, _, success) = run_capt(&config_path, &["search", "xyzzy"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_capt(&config_path, &["search", "   "]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_archive_with_context() {
    let (tmp, config_path) = setup_test_env();
    seed_archive(tmp.path());

    let (stdout, stderr, success) = run_capt(&config_path, &["search", "VITAMIN d"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("Vitamin D deep dive"), "got: {}", stdout);
    assert!(stdout.contains("(1 matches)"));
    assert!(stdout.contains("[0:05] \"sunlight matters and vitamin D is made in skin end\""));
    assert!(!stdout.contains("Unrelated"));
}

#[test]
fn test_search_leaves_missing_database_uncreated() {
    let (tmp, config_path) = setup_test_env();
    seed_archive(tmp.path());

    let (stdout, stderr, success) = run_capt(&config_path, &["search", "sunlight"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("Vitamin D deep dive"));
    assert!(!tmp.path().join("data/captions.sqlite").exists());
}

#[test]
fn test_search_json_normalizes_query() {
    let (tmp, config_path) = setup_test_env();
    seed_archive(tmp.path());

    let (stdout, _, success) = run_capt(&config_path, &["search", "  Vitamin ", "--json"]);
    assert!(success);
    let resp: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(resp["query"], "vitamin");
    assert_eq!(resp["results"].as_array().unwrap().len(), 1);
    assert_eq!(resp["results"][0]["videoId"], "arch1");
    assert_eq!(resp["results"][0]["totalSnippets"], 1);
}

#[test]
fn test_search_ignores_stray_archive_files() {
    let (tmp, config_path) = setup_test_env();
    seed_archive(tmp.path());
    fs::write(common::archive_dir(tmp.path()).join("notes.json"), "not json").unwrap();

    let (stdout, _, success) = run_capt(&config_path, &["search", "sunlight"]);
    assert!(success);
    assert!(stdout.contains("Vitamin D deep dive"));
}

#[test]
fn test_get_from_archive() {
    let (tmp, config_path) = setup_test_env();
    seed_archive(tmp.path());

    let (stdout, stderr, success) = run_capt(&config_path, &["get", "arch1"]);
    assert!(success, "get failed: {}", stderr);
    assert!(stdout.contains("title:        Vitamin D deep dive"));
    assert!(stdout.contains("source:       archive"));
    assert!(stdout.contains("--- Transcript (4 segments) ---"));
    assert!(stdout.contains("[0:10] is made in skin"));
}

#[test]
fn test_get_missing_video() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_capt(&config_path, &["get", "nope"]);
    assert!(!success);
    assert!(stderr.contains("video not found"));
}

#[test]
fn test_store_clear_requires_yes() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_capt(&config_path, &["store", "clear"]);
    assert!(!success);
    assert!(stderr.contains("--yes"));

    let (stdout, _, success) = run_capt(&config_path, &["store", "clear", "--yes"]);
    assert!(success);
    assert!(stdout.contains("Removed 0 keys."));
}

#[test]
fn test_stats_on_empty_setup() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_capt(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Live store:"));
    assert!(stdout.contains("(no partitions)"));
}

#[test]
fn test_sync_without_reachable_api_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_capt(&config_path, &["sync", "--progress", "off"]);
    assert!(!success);
}

#[test]
fn test_sync_store_then_search() {
    let (_tmp, config_path, fake) = setup_with_fake(default_videos(), "");

    let (stdout, stderr, success) = run_capt(&config_path, &["sync", "--progress", "off"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("sync store"));
    assert!(stdout.contains("listed: 3 videos"));
    assert!(stdout.contains("fetched: 2"));
    assert!(stdout.contains("captions disabled: 1"));
    assert!(stdout.contains("failed: 0"));
    assert_eq!(fake.timedtext_hits(), 2);

    let (stdout, _, _) = run_capt(&config_path, &["search", "vitamin", "--json"]);
    let resp: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<_> = resp["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["videoId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["vid2023a", "vid2024a"]);

    let (stdout, _, success) = run_capt(&config_path, &["get", "vid2024b"]);
    assert!(success);
    assert!(stdout.contains("captions:     disabled"));
    assert!(stdout.contains("source:       store"));
}

#[test]
fn test_sync_twice_fetches_nothing_new() {
    let (_tmp, config_path, fake) = setup_with_fake(default_videos(), "");

    run_capt(&config_path, &["sync", "--progress", "off"]);
    let hits = fake.timedtext_hits();

    let (stdout, _, success) = run_capt(&config_path, &["sync", "--progress", "off"]);
    assert!(success);
    assert!(stdout.contains("reused: 3"), "got: {}", stdout);
    assert!(stdout.contains("written: 0"));
    assert_eq!(fake.timedtext_hits(), hits);
}

#[test]
fn test_title_change_refetches_one_video() {
    let (_tmp, config_path, fake) = setup_with_fake(default_videos(), "");

    run_capt(&config_path, &["sync", "--progress", "off"]);
    let hits = fake.timedtext_hits();
    fake.set_title("vid2024a", "Vitamin C basics (2nd edition)");

    let (stdout, _, success) = run_capt(&config_path, &["sync", "--progress", "off"]);
    assert!(success);
    assert!(stdout.contains("fetched: 1"), "got: {}", stdout);
    assert!(stdout.contains("identical: 1"));
    assert_eq!(fake.timedtext_hits(), hits + 1);
}

#[test]
fn test_sync_min_year_and_archive_seed() {
    let (tmp, config_path, fake) = setup_with_fake(default_videos(), "min_year = 2024");
    write_partition(
        tmp.path(),
        2024,
        serde_json::json!({
            "vid2024a": record_json("vid2024a", "Vitamin C basics", "2024-02-01T10:00:00Z", &["archived copy"]),
        }),
    );

    let (stdout, stderr, success) = run_capt(&config_path, &["sync", "--progress", "off"]);
    assert!(success, "sync failed: {}", stderr);
    // 2023 video is below the cutoff, vid2024a is already archived
    assert!(stdout.contains("skipped: 2"), "got: {}", stdout);
    assert_eq!(fake.timedtext_hits(), 0);
}

#[test]
fn test_snapshot_writes_year_files() {
    let (tmp, config_path, fake) = setup_with_fake(default_videos(), "");

    let (stdout, stderr, success) =
        run_capt(&config_path, &["sync", "--snapshot", "--progress", "off"]);
    assert!(success, "snapshot failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("sync snapshot"));

    let dir = common::archive_dir(tmp.path());
    let y2024: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("2024.json")).unwrap()).unwrap();
    let y2023: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("2023.json")).unwrap()).unwrap();
    assert_eq!(y2024["videos"].as_object().unwrap().len(), 2);
    assert_eq!(y2024["videos"]["vid2024b"]["captionsDisabled"], true);
    assert_eq!(y2023["videos"]["vid2023a"]["transcript"][1]["text"], "fasting & metabolism");

    // Archived videos are never fetched again
    let hits = fake.timedtext_hits();
    let (stdout, _, success) = run_capt(&config_path, &["sync", "--snapshot", "--progress", "off"]);
    assert!(success);
    assert!(stdout.contains("reused: 3"));
    assert_eq!(fake.timedtext_hits(), hits);
}

#[test]
fn test_snapshot_min_year_leaves_old_years_alone() {
    let (tmp, config_path, _fake) = setup_with_fake(default_videos(), "");

    let (_, _, success) = run_capt(
        &config_path,
        &["sync", "--snapshot", "--min-year", "2024", "--progress", "off"],
    );
    assert!(success);
    let dir = common::archive_dir(tmp.path());
    assert!(dir.join("2024.json").exists());
    assert!(!dir.join("2023.json").exists());
}

#[test]
fn test_unknown_channel_fails() {
    let fake = FakeYouTube::start(vec![FakeVideo::disabled("x", "x", "2024-01-01T00:00:00Z")]);
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), &fake.api_base_url(), &fake.base_url, "");
    let content = fs::read_to_string(&config_path)
        .unwrap()
        .replace(common::HANDLE, "SomeoneElse");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_capt(&config_path, &["sync", "--progress", "off"]);
    assert!(!success);
    assert!(stderr.contains("channel not found"), "got: {}", stderr);
}
