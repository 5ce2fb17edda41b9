use assert_fs::fixture::{FileWriteStr, PathChild};
use predicates::prelude::predicate;

mod common;

fn commit_file(dir: &assert_fs::TempDir, name: &str, content: &str, message: &str) {
    dir.child(name).write_str(content).unwrap();
    common::grit()
        .current_dir(dir.path())
        .arg("add")
        .arg(name)
        .assert()
        .success();
    common::grit()
        .current_dir(dir.path())
        .envs(common::author_env("Ada", "ada@example.com"))
        .arg("commit")
        .arg("-m")
        .arg(message)
        .assert()
        .success();
}

#[test]
fn branch_lists_current_branch_first_starred() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    commit_file(&dir, "file.txt", "content", "initial");

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .arg("feature")
        .assert()
        .success();

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^  feature$")?)
        .stdout(predicate::str::is_match(r"(?m)^\* master$")?);

    Ok(())
}

#[test]
fn created_branch_points_at_current_head() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    commit_file(&dir, "file.txt", "content", "initial");

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .arg("feature")
        .assert()
        .success();

    let master = std::fs::read_to_string(dir.child(".grit/refs/heads/master").path())?;
    let feature = std::fs::read_to_string(dir.child(".grit/refs/heads/feature").path())?;
    assert_eq!(master.trim(), feature.trim());

    Ok(())
}

#[test]
fn duplicate_branch_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    commit_file(&dir, "file.txt", "content", "initial");

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .arg("feature")
        .assert()
        .success();

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .arg("feature")
        .assert()
        .failure();

    Ok(())
}

#[test]
fn deleting_a_branch_reports_its_tip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    commit_file(&dir, "file.txt", "content", "initial");

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .arg("feature")
        .assert()
        .success();

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .arg("feature")
        .arg("-d")
        .assert()
        .success()
        .stdout(predicate::str::is_match(
            r"(?m)^Deleted branch feature \(was [0-9a-f]{7}\)$",
        )?);

    assert!(!dir.child(".grit/refs/heads/feature").path().exists());

    Ok(())
}

#[test]
fn branch_name_with_invalid_characters_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    commit_file(&dir, "file.txt", "content", "initial");

    for invalid in ["feat..ure", "feature.lock", "feat^ure", "/leading"] {
        common::grit()
            .current_dir(dir.path())
            .arg("branch")
            .arg(invalid)
            .assert()
            .failure();
    }

    Ok(())
}

#[test]
fn branching_without_commits_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();

    common::grit()
        .current_dir(dir.path())
        .arg("branch")
        .arg("feature")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no current HEAD"));

    Ok(())
}

#[test]
fn config_values_round_trip_through_the_cli() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();

    common::grit()
        .current_dir(dir.path())
        .arg("config")
        .arg("remote.origin.url")
        .arg("http://localhost:8080/repo")
        .assert()
        .success();

    common::grit()
        .current_dir(dir.path())
        .arg("config")
        .arg("remote.origin.url")
        .assert()
        .success()
        .stdout(predicate::str::diff("http://localhost:8080/repo\n"));

    common::grit()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "remote.origin.url=http://localhost:8080/repo",
        ));

    Ok(())
}

#[test]
fn reading_a_missing_config_key_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();

    common::grit()
        .current_dir(dir.path())
        .arg("config")
        .arg("remote.origin.url")
        .assert()
        .failure();

    Ok(())
}
