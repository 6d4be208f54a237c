use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

fn unique_workspace(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&path).expect("workspace should be creatable");
    path
}

fn notely(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_notely"))
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("NOTELY_DB_PATH")
        .env_remove("NOTELY_CONFIG")
        .env_remove("NOTELY_BIND")
        .env_remove("NOTELY_LOG")
        .env_remove("RUST_LOG")
        .current_dir(home)
        .args(args)
        .output()
        .expect("notely should run")
}

fn with_db(home: &Path, args: &[&str]) -> Output {
    let db = home.join("data").join("notes.db");
    let db = db.to_str().expect("db path should be utf-8").to_string();
    let mut full = vec!["--db", db.as_str()];
    full.extend_from_slice(args);
    notely(home, &full)
}

fn assert_success(output: &Output) -> String {
    assert!(
        output.status.success(),
        "expected success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_failure(output: &Output) -> String {
    assert!(
        !output.status.success(),
        "expected failure, stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    assert_eq!(output.status.code(), Some(1));
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

#[test]
fn add_list_show_round_trip() {
    let home = unique_workspace("notely-cli-basic");

    let created = assert_success(&with_db(
        &home,
        &["add", "-t", "Plan", "-c", "see [[Ideas]]", "-g", "Work, ideas,work"],
    ));
    assert_eq!(created.trim(), "created #1: Plan");
    assert_success(&with_db(&home, &["add", "-t", "Ideas"]));

    let list = parse_json(&with_db(&home, &["list", "--json", "--sort", "title"]));
    let titles: Vec<&str> = list
        .as_array()
        .expect("list should be an array")
        .iter()
        .filter_map(|note| note["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Ideas", "Plan"]);
    assert_eq!(list[1]["tags"], serde_json::json!(["ideas", "work"]));

    let table = assert_success(&with_db(&home, &["list", "--tag", "work"]));
    assert!(table.contains("ID  TITLE  TAGS        PINNED  ARCHIVED  UPDATED"));
    assert!(table.contains("#1  Plan   ideas,work  no      no"));
    assert!(table.contains("filters: tag=work"));
    assert!(!table.contains("Ideas"));

    let shown = assert_success(&with_db(&home, &["show", "Ideas"]));
    assert!(shown.contains("#2 Ideas"));
    assert!(shown.contains("_<empty>_"));
    assert!(shown.contains("Backlinks"));
    assert!(shown.contains("#1 Plan"));

    let detail = parse_json(&with_db(&home, &["show", "1", "--json"]));
    assert_eq!(detail["links"], serde_json::json!(["Ideas"]));

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn lifecycle_commands_report_and_persist() {
    let home = unique_workspace("notely-cli-lifecycle");
    assert_success(&with_db(&home, &["add", "-t", "Task"]));

    let pinned = assert_success(&with_db(&home, &["pin", "Task"]));
    assert_eq!(pinned.trim(), "pinned #1: Task");
    let edited = assert_success(&with_db(
        &home,
        &["edit", "1", "-t", "Task v2", "--no-pin"],
    ));
    assert_eq!(edited.trim(), "updated #1: Task v2");

    let archived = assert_success(&with_db(&home, &["archive", "1"]));
    assert_eq!(archived.trim(), "archived #1: Task v2");
    let visible = parse_json(&with_db(&home, &["list", "--json"]));
    assert_eq!(visible, serde_json::json!([]));
    let all = parse_json(&with_db(&home, &["list", "--json", "--archived"]));
    assert_eq!(all[0]["archived"], true);
    assert_eq!(all[0]["pinned"], false);

    let restored = assert_success(&with_db(&home, &["restore", "Task v2"]));
    assert_eq!(restored.trim(), "restored #1: Task v2");

    assert_success(&with_db(&home, &["delete", "1"]));
    let soft = parse_json(&with_db(&home, &["show", "1", "--json"]));
    assert_eq!(soft["archived"], true);

    assert_success(&with_db(&home, &["purge", "1"]));
    let stderr = assert_failure(&with_db(&home, &["show", "1"]));
    assert!(stderr.contains("error: note #1 not found"));

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn missing_targets_fail_only_where_required() {
    let home = unique_workspace("notely-cli-missing");

    assert_success(&with_db(&home, &["delete", "ghost"]));
    assert_success(&with_db(&home, &["delete", "ghost", "--hard"]));
    assert_success(&with_db(&home, &["purge", "42"]));

    for command in ["pin", "unpin", "archive", "unarchive", "restore"] {
        let stderr = assert_failure(&with_db(&home, &[command, "ghost"]));
        assert!(
            stderr.contains("note 'ghost' not found"),
            "{command} stderr: {stderr}"
        );
    }
    assert_failure(&with_db(&home, &["edit", "7", "-t", "x"]));

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn blank_titles_and_bad_sorts_are_rejected() {
    let home = unique_workspace("notely-cli-invalid");

    let stderr = assert_failure(&with_db(&home, &["add", "-t", "  "]));
    assert!(stderr.contains("title must not be blank"));

    let output = with_db(&home, &["list", "--sort", "newest"]);
    assert!(!output.status.success());

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn export_then_import_into_fresh_database() {
    let home = unique_workspace("notely-cli-transfer");
    assert_success(&with_db(&home, &["add", "-t", "keep", "-g", "a"]));
    assert_success(&with_db(&home, &["add", "-t", "old"]));
    assert_success(&with_db(&home, &["archive", "old"]));

    let backup = home.join("backup").join("notes.json");
    let backup_arg = backup.to_str().expect("backup path should be utf-8");
    let exported = assert_success(&with_db(&home, &["export", "--to", backup_arg]));
    assert!(exported.starts_with("exported 2 note(s)"));

    let other_db = home.join("other.db");
    let other_arg = other_db.to_str().expect("db path should be utf-8");
    let imported = assert_success(&notely(
        &home,
        &["--db", other_arg, "import", "--from", backup_arg],
    ));
    assert_eq!(imported.trim(), "imported 2 note(s)");

    let all = parse_json(&notely(
        &home,
        &["--db", other_arg, "list", "--json", "--archived", "--sort", "title"],
    ));
    assert_eq!(all[0]["title"], "keep");
    assert_eq!(all[1]["title"], "old");
    assert_eq!(all[1]["archived"], true);

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn db_path_comes_from_config_file_when_no_flag() {
    let home = unique_workspace("notely-cli-config");
    let config_dir = home.join(".notely");
    std::fs::create_dir_all(&config_dir).expect("config dir should be creatable");
    let configured = home.join("configured.db");
    std::fs::write(
        config_dir.join("config.toml"),
        format!("db_path = {:?}\n", configured.display().to_string()),
    )
    .expect("config should be writable");

    assert_success(&notely(&home, &["add", "-t", "from config"]));
    assert!(configured.exists(), "database should be created at configured path");

    std::fs::write(config_dir.join("config.toml"), "unknown = 1\n")
        .expect("config should be writable");
    let stderr = assert_failure(&notely(&home, &["list"]));
    assert!(stderr.contains("invalid config"));

    let _ = std::fs::remove_dir_all(home);
}

#[test]
fn completions_print_without_touching_database() {
    let home = unique_workspace("notely-cli-completions");
    let script = assert_success(&notely(&home, &["completions", "bash"]));
    assert!(script.contains("notely"));
    assert!(!home.join(".notely").join("notely.db").exists());
    let _ = std::fs::remove_dir_all(home);
}
