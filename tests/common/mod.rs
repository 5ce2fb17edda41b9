#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::predicate;

/// Spawn the binary under test.
pub fn grit() -> Command {
    Command::cargo_bin("grit").expect("binary builds")
}

/// Create a temp directory holding a freshly initialized repository.
pub fn init_repo() -> TempDir {
    let dir = TempDir::new().expect("temp dir");

    grit()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized empty grit repository"));

    dir
}

/// Author identity environment for commit commands.
pub fn author_env(name: &str, email: &str) -> Vec<(&'static str, String)> {
    vec![
        ("GRIT_AUTHOR_NAME", name.to_string()),
        ("GRIT_AUTHOR_EMAIL", email.to_string()),
    ]
}
