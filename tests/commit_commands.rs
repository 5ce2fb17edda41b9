use assert_fs::fixture::{FileWriteStr, PathChild};
use fake::Fake;
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::{Word, Words};
use fake::faker::name::en::Name;
use predicates::prelude::predicate;

mod common;

fn read_head_oid(dir: &assert_fs::TempDir) -> String {
    let head = std::fs::read_to_string(dir.child(".grit/HEAD").path()).unwrap();
    let branch = head.trim().strip_prefix("ref: ").unwrap().to_string();
    std::fs::read_to_string(dir.child(format!(".grit/{branch}")).path())
        .unwrap()
        .trim()
        .to_string()
}

#[test]
fn first_commit_is_a_root_commit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();

    let file_count = (1..=5).fake::<usize>();
    for _ in 0..file_count {
        let file_name = format!("{}.txt", Word().fake::<String>());
        let file_content = Words(5..10).fake::<Vec<String>>().join(" ");
        dir.child(file_name).write_str(&file_content)?;
    }

    let author_name = Name().fake::<String>().replace(" ", "_");
    let author_email = FreeEmail().fake::<String>();
    let message = Words(5..10).fake::<Vec<String>>().join(" ");

    common::grit()
        .current_dir(dir.path())
        .arg("add")
        .arg(".")
        .assert()
        .success();

    common::grit()
        .current_dir(dir.path())
        .envs(common::author_env(&author_name, &author_email))
        .arg("commit")
        .arg("-m")
        .arg(&message)
        .assert()
        .success()
        .stdout(predicate::str::is_match(
            r"(?m)^\[\(root-commit\) [0-9a-f]{7}\] .+$",
        )?);

    let commit_oid = read_head_oid(&dir);
    assert_eq!(commit_oid.len(), 40);

    // the commit object carries the tree, identity and message, no parent
    common::grit()
        .current_dir(dir.path())
        .arg("cat-file")
        .arg(&commit_oid)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^tree [0-9a-f]{40}$")?)
        .stdout(predicate::str::contains(&author_name))
        .stdout(predicate::str::contains(&author_email))
        .stdout(predicate::str::contains(&message))
        .stdout(predicate::str::contains("parent").count(0));

    Ok(())
}

#[test]
fn second_commit_references_its_parent() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    let env = common::author_env("Ada_Lovelace", "ada@example.com");

    dir.child("file.txt").write_str("first version")?;
    common::grit()
        .current_dir(dir.path())
        .arg("add")
        .arg("file.txt")
        .assert()
        .success();
    common::grit()
        .current_dir(dir.path())
        .envs(env.clone())
        .arg("commit")
        .arg("-m")
        .arg("first")
        .assert()
        .success();
    let first_oid = read_head_oid(&dir);

    dir.child("file.txt").write_str("second version")?;
    common::grit()
        .current_dir(dir.path())
        .arg("add")
        .arg("file.txt")
        .assert()
        .success();
    common::grit()
        .current_dir(dir.path())
        .envs(env)
        .arg("commit")
        .arg("-m")
        .arg("second")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^\[[0-9a-f]{7}\] second$")?);

    let second_oid = read_head_oid(&dir);
    assert_ne!(first_oid, second_oid);

    common::grit()
        .current_dir(dir.path())
        .arg("cat-file")
        .arg(&second_oid)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("parent {first_oid}")));

    Ok(())
}

#[test]
fn nested_directories_become_subtrees() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();

    dir.child("src/lib.rs").write_str("pub fn f() {}")?;
    dir.child("src/util/mod.rs").write_str("pub fn g() {}")?;
    dir.child("README.md").write_str("# readme")?;

    common::grit()
        .current_dir(dir.path())
        .arg("add")
        .arg(".")
        .assert()
        .success();
    common::grit()
        .current_dir(dir.path())
        .envs(common::author_env("Ada", "ada@example.com"))
        .arg("commit")
        .arg("-m")
        .arg("tree shape")
        .assert()
        .success();

    let commit_oid = read_head_oid(&dir);
    let commit_text = String::from_utf8(
        common::grit()
            .current_dir(dir.path())
            .arg("cat-file")
            .arg(&commit_oid)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone(),
    )?;
    let tree_oid = commit_text
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().last())
        .unwrap()
        .to_string();

    // root tree holds README.md and the src directory, name-sorted
    common::grit()
        .current_dir(dir.path())
        .arg("cat-file")
        .arg(&tree_oid)
        .assert()
        .success()
        .stdout(predicate::str::contains("README.md"))
        .stdout(predicate::str::contains("src"))
        .stdout(predicate::str::contains("lib.rs").count(0));

    Ok(())
}

#[test]
fn log_walks_history_newest_first() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    let env = common::author_env("Ada", "ada@example.com");

    for (step, message) in ["one", "two", "three"].iter().enumerate() {
        dir.child("file.txt").write_str(&format!("v{step}"))?;
        common::grit()
            .current_dir(dir.path())
            .arg("add")
            .arg("file.txt")
            .assert()
            .success();
        common::grit()
            .current_dir(dir.path())
            .envs(env.clone())
            .arg("commit")
            .arg("-m")
            .arg(message)
            .assert()
            .success();
    }

    let log = String::from_utf8(
        common::grit()
            .current_dir(dir.path())
            .arg("log")
            .arg("--oneline")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone(),
    )?;

    let messages: Vec<&str> = log
        .lines()
        .map(|line| line.rsplit(' ').next().unwrap())
        .collect();
    assert_eq!(messages, vec!["three", "two", "one"]);

    common::grit()
        .current_dir(dir.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("Author: Ada <ada@example.com>"))
        .stdout(predicate::str::contains("Date:   "));

    Ok(())
}

#[test]
fn commit_without_author_identity_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = common::init_repo();
    dir.child("file.txt").write_str("content")?;

    common::grit()
        .current_dir(dir.path())
        .arg("add")
        .arg("file.txt")
        .assert()
        .success();

    common::grit()
        .current_dir(dir.path())
        .env_remove("GRIT_AUTHOR_NAME")
        .env_remove("GRIT_AUTHOR_EMAIL")
        .arg("commit")
        .arg("-m")
        .arg("anonymous")
        .assert()
        .failure();

    Ok(())
}
