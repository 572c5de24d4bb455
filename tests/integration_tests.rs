//! Integration tests for the mgf-offset binary
//!
//! Each test builds a throwaway working directory, category roots and
//! metadata database, then drives the real binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CATEGORIES: [&str; 4] = ["DIA", "DDA", "HCD", "ETD"];

fn mgf_offset() -> Command {
    let mut cmd = cargo_bin_cmd!("mgf-offset");
    cmd.env_remove("MGF_OFFSET_CONFIG")
        .env_remove("MGF_DATABASE")
        .env_remove("MGF_PROCESSOR_CMD")
        .env_remove("MGF_LOG_LEVEL")
        .env_remove("RUST_LOG");
    for category in CATEGORIES {
        cmd.env_remove(format!("MGF_{}_FOLDER", category));
    }
    cmd
}

/// Working directory, four empty category roots and a metadata database.
struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for category in CATEGORIES {
            fs::create_dir_all(dir.path().join("roots").join(category.to_lowercase())).unwrap();
        }
        fs::create_dir_all(dir.path().join("work/uploaded")).unwrap();
        let conn = Connection::open(dir.path().join("ms.sqlite")).unwrap();
        conn.execute_batch(
            "CREATE TABLE ms_run (file_name TEXT PRIMARY KEY, run_id INTEGER, ms2_count INTEGER);",
        )
        .unwrap();
        Self { dir }
    }

    fn work(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn root(&self, category: &str) -> PathBuf {
        self.dir.path().join("roots").join(category.to_lowercase())
    }

    fn register(&self, basename: &str, run_id: i64, ms2_count: i64) {
        let conn = Connection::open(self.dir.path().join("ms.sqlite")).unwrap();
        conn.execute(
            "INSERT INTO ms_run VALUES (?1, ?2, ?3)",
            rusqlite::params![basename, run_id, ms2_count],
        )
        .unwrap();
    }

    fn add_uploaded_file(&self, category: &str, basename: &str) {
        let run = self.root(category).join("run_01");
        fs::create_dir_all(&run).unwrap();
        fs::write(run.join(basename), "BEGIN IONS\nEND IONS\n").unwrap();
        fs::write(
            self.work().join("uploaded").join(format!("{}.uploaded", basename)),
            "",
        )
        .unwrap();
    }

    fn command(&self, processor: &str) -> Command {
        let mut cmd = mgf_offset();
        cmd.current_dir(self.dir.path())
            .env("MGF_DATABASE", self.dir.path().join("ms.sqlite"))
            .env("MGF_PROCESSOR_CMD", processor);
        for category in CATEGORIES {
            cmd.env(format!("MGF_{}_FOLDER", category), self.root(category));
        }
        cmd.arg(self.work());
        cmd
    }

    fn log_files(&self) -> Vec<PathBuf> {
        log_files_in(&self.work())
    }
}

fn log_files_in(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| {
                    let n = n.to_string_lossy();
                    n.starts_with("MGF_Offset_") && n.ends_with(".log")
                })
                .unwrap_or(false)
        })
        .collect()
}

// =============================================================================
// Command surface
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        mgf_offset().arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        mgf_offset()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_missing_argument_prints_usage_without_side_effects() {
        let dir = TempDir::new().unwrap();

        mgf_offset()
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("MGF Offset (v"))
            .stdout(predicate::str::contains("command: mgf-offset <WORK_DIR>"));

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_extra_argument_prints_usage_without_side_effects() {
        let dir = TempDir::new().unwrap();

        mgf_offset()
            .current_dir(dir.path())
            .args(["work", "extra"])
            .assert()
            .success()
            .stdout(predicate::str::contains("command: mgf-offset <WORK_DIR>"));

        assert!(!dir.path().join("work").exists());
    }

    #[test]
    fn test_banner_is_printed() {
        let dir = TempDir::new().unwrap();
        mgf_offset()
            .current_dir(dir.path())
            .assert()
            .stdout(predicate::str::starts_with("=".repeat(100)));
    }
}

// =============================================================================
// Runs
// =============================================================================

mod runs {
    use super::*;

    #[test]
    fn test_empty_roots_clean_up_lock_and_log() {
        let site = Site::new();

        site.command("exit 0")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to do"));

        assert!(!site.work().join("MGF_Offset.lock").exists());
        assert!(site.log_files().is_empty());
    }

    #[test]
    fn test_ready_file_is_processed_and_log_kept() {
        let site = Site::new();
        site.add_uploaded_file("DIA", "s1.mgf");
        site.register("s1.mgf", 5, 10);

        site.command("test \"$MGF_TAGGED\" = true")
            .assert()
            .success()
            .stdout(predicate::str::contains("Dispatched 1 file(s), 0 failed"));

        assert!(site.work().join("s1.mgf.done").exists());
        assert!(!site.work().join("s1.mgf.process").exists());
        assert!(!site.work().join("MGF_Offset.lock").exists());
        let logs = site.log_files();
        assert_eq!(logs.len(), 1);
        let content = fs::read_to_string(&logs[0]).unwrap();
        assert!(content.contains("Deleting lock file"));
    }

    #[test]
    fn test_dda_file_is_untagged() {
        let site = Site::new();
        site.add_uploaded_file("DDA", "d1.mgf");
        site.register("d1.mgf", 7, 3);

        site.command("test \"$MGF_TAGGED\" = false").assert().success();

        assert!(site.work().join("d1.mgf.done").exists());
    }

    #[test]
    fn test_failing_unit_leaves_error_marker() {
        let site = Site::new();
        site.add_uploaded_file("HCD", "bad.mgf");
        site.register("bad.mgf", 5, 10);

        site.command("echo 'corrupt spectrum' >&2; exit 1")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 failed"));

        let marker = fs::read_to_string(site.work().join("bad.mgf.error")).unwrap();
        assert!(marker.contains("corrupt spectrum"));
        assert!(!site.work().join("MGF_Offset.lock").exists());
    }

    #[test]
    fn test_done_marker_prevents_reprocessing() {
        let site = Site::new();
        site.add_uploaded_file("ETD", "s1.mgf");
        site.register("s1.mgf", 5, 10);
        fs::write(site.work().join("s1.mgf.done"), "").unwrap();

        site.command("touch \"$MGF_WORK_DIR/ran\"")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to do"));

        assert!(!site.work().join("ran").exists());
        assert!(site.log_files().is_empty());
    }

    #[test]
    fn test_unready_metadata_is_skipped() {
        let site = Site::new();
        site.add_uploaded_file("DIA", "pending.mgf");
        site.register("pending.mgf", -1, 10);

        site.command("exit 0").assert().success();

        assert!(!site.work().join("pending.mgf.done").exists());
        assert!(site.log_files().is_empty());
    }

    #[test]
    fn test_second_run_skips_processed_files() {
        let site = Site::new();
        site.add_uploaded_file("DIA", "s1.mgf");
        site.register("s1.mgf", 5, 10);

        site.command("exit 0").assert().success();
        site.command("exit 0")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to do"));
    }

    #[test]
    fn test_existing_lock_blocks_run() {
        let site = Site::new();
        site.add_uploaded_file("DIA", "s1.mgf");
        site.register("s1.mgf", 5, 10);
        fs::write(site.work().join("MGF_Offset.lock"), "").unwrap();

        site.command("exit 0").assert().success();

        assert!(site.work().join("MGF_Offset.lock").exists());
        assert!(!site.work().join("s1.mgf.done").exists());
        assert!(site.log_files().is_empty());
    }

    #[test]
    fn test_missing_root_fails_and_keeps_lock() {
        let site = Site::new();
        fs::remove_dir_all(site.root("HCD")).unwrap();

        site.command("exit 0").assert().failure();

        assert!(site.work().join("MGF_Offset.lock").exists());
        let logs = site.log_files();
        assert_eq!(logs.len(), 1);
        let content = fs::read_to_string(&logs[0]).unwrap();
        assert!(content.contains("MGF Offset failed!"));
    }

    #[test]
    fn test_missing_database_fails_before_locking() {
        let site = Site::new();

        site.command("exit 0")
            .env("MGF_DATABASE", site.work().join("absent.sqlite"))
            .assert()
            .failure();

        assert!(!site.work().join("MGF_Offset.lock").exists());
    }

    #[test]
    fn test_relative_work_dir_is_created() {
        let site = Site::new();
        let mut cmd = mgf_offset();
        cmd.current_dir(site.dir.path())
            .env("MGF_DATABASE", site.dir.path().join("ms.sqlite"))
            .env("MGF_PROCESSOR_CMD", "exit 0");
        for category in CATEGORIES {
            cmd.env(format!("MGF_{}_FOLDER", category), site.root(category));
        }

        cmd.arg("fresh/work").assert().success();

        let work = site.dir.path().join("fresh/work");
        assert!(work.is_dir());
        assert!(!work.join("MGF_Offset.lock").exists());
    }

    #[test]
    fn test_config_file_in_work_dir_is_used() {
        let site = Site::new();
        site.add_uploaded_file("DIA", "s1.mgf");
        site.register("s1.mgf", 5, 10);
        let mut config = format!(
            "[database]\npath = \"{}\"\n\n[processor]\ncommand = \"exit 0\"\n\n[folders]\n",
            site.dir.path().join("ms.sqlite").display()
        );
        for category in CATEGORIES {
            config.push_str(&format!(
                "{} = \"{}\"\n",
                category.to_lowercase(),
                site.root(category).display()
            ));
        }
        fs::write(site.work().join("mgf_offset.toml"), config).unwrap();

        mgf_offset()
            .current_dir(site.dir.path())
            .arg(site.work())
            .assert()
            .success();

        assert!(site.work().join("s1.mgf.done").exists());
    }
}
