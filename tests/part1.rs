use assert_cmd::Command;

#[test]
fn part1_output_right_answer() {
    let mut cmd = Command::cargo_bin("part1").unwrap();
    cmd.arg("tests/data/sample.txt");

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("is 7."));
}

#[test]
fn part1_fails_on_unsolvable_machine() {
    let mut cmd = Command::cargo_bin("part1").unwrap();
    cmd.arg("tests/data/mixed.txt");

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("machine #2"));
}

#[test]
fn part1_skips_unsolvable_machine_on_request() {
    let mut cmd = Command::cargo_bin("part1").unwrap();
    cmd.args(["tests/data/mixed.txt", "--skip-failed", "--jobs", "2"]);

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("is 4."))
        .stderr(predicates::str::contains("1 machine(s) skipped"));
}
