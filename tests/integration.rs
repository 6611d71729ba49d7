use assert_cmd::Command;
use predicates::boolean::PredicateBooleanExt;
use predicates::str::{contains, is_match};

const BINARY_NAME: &str = "iridium";

#[test]
fn handshake() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");

    drop(
        cmd.write_stdin("hello\nisready\n")
            .assert()
            .success()
            .stdout(
                contains("id name iridium")
                    .and(contains("id author"))
                    .and(contains("option name Exploration"))
                    .and(contains("hellook"))
                    .and(contains("readyok")),
            ),
    );
}

#[test]
fn plays_a_move() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");
    let _ = cmd.args(["--seed", "7", "--move-time", "20"]);

    drop(
        cmd.write_stdin("play e5\ngo\nresult\nquit\n")
            .assert()
            .success()
            .stdout(
                is_match(r"(?m)^info iterations \d+ nodes \d+ time \d+ visits \d+ winrate \d+%$")
                    .unwrap()
                    .and(is_match(r"(?m)^bestmove [d-f][4-6]$").unwrap())
                    .and(contains("*")),
            ),
    );
}

#[test]
fn negamax_strategy() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");
    let _ = cmd.args(["--strategy", "negamax", "--depth", "3"]);

    drop(
        cmd.write_stdin("go\n")
            .assert()
            .success()
            .stdout(
                contains("info depth 1 score")
                    .and(is_match(r"(?m)^bestmove [a-i][1-9]$").unwrap()),
            ),
    );
}

#[test]
fn rejects_invalid_arguments() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");
    let _ = cmd.args(["--exploration", "-1"]);

    drop(cmd.write_stdin("").assert().failure());
}

#[test]
fn bench_output() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");
    let _ = cmd.arg("bench");

    drop(
        cmd.assert()
            .stdout(is_match(r"^\d+ nodes \d+ nps\n$").unwrap())
            .success(),
    );
}

#[test]
fn selfplay() {
    let mut cmd = Command::cargo_bin("selfplay").expect("Binary should be built");
    let _ = cmd.args(["--games", "1", "--move-time", "5", "--o", "negamax", "--depth", "2"]);

    drop(
        cmd.assert()
            .success()
            .stdout(is_match(r"(?m)^Game 1: (1-0|0-1|1/2-1/2) in \d+ moves$").unwrap()),
    );
}
