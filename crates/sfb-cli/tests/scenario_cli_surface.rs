//! CLI surface checks.
//!
//! GREEN when:
//! - Every subcommand tree is wired and self-describing.
//! - Required arguments are enforced before any store connection happens.

use assert_cmd::Command;
use predicates::prelude::*;

fn sfb() -> Command {
    Command::cargo_bin("sfb").unwrap()
}

#[test]
fn top_level_lists_all_subcommands() {
    sfb()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lock"))
        .stdout(predicate::str::contains("queue"))
        .stdout(predicate::str::contains("worker"))
        .stdout(predicate::str::contains("completion"));
}

#[test]
fn lock_subcommands_are_wired() {
    sfb()
        .args(["lock", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acquire"))
        .stdout(predicate::str::contains("heartbeat"))
        .stdout(predicate::str::contains("release"))
        .stdout(predicate::str::contains("read"));
}

#[test]
fn acquire_requires_owner_and_bucket() {
    sfb()
        .args(["lock", "acquire"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--bucket"));
}

#[test]
fn queue_init_requires_shard_list() {
    sfb()
        .args([
            "queue",
            "init",
            "--bucket",
            "b",
            "--run-id",
            "1",
            "--benchmark-uuid",
            "0123456789abcdef0123456789abcdef",
            "--max-parallel-instances",
            "1",
            "--lock-owner",
            "o",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--shards-json-b64"));
}

#[test]
fn queue_init_rejects_an_invalid_shard_list_before_any_io() {
    // "W10=" is base64 for "[]": an empty shard list must be rejected.
    sfb()
        .args([
            "queue",
            "init",
            "--bucket",
            "b",
            "--run-id",
            "1",
            "--benchmark-uuid",
            "0123456789abcdef0123456789abcdef",
            "--shards-json-b64",
            "W10=",
            "--max-parallel-instances",
            "1",
            "--lock-owner",
            "o",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn completion_check_supports_plain_output_flag() {
    sfb()
        .args(["completion", "check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--grace-seconds"))
        .stdout(predicate::str::contains("--exit-nonzero-if-incomplete"));
}
