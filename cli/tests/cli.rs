use assert_cmd::Command;
use predicates::prelude::*;

fn attack_sim() -> Command {
    Command::cargo_bin("attack-sim").unwrap()
}

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[test]
fn roll_prints_one_outcome() {
    attack_sim()
        .args(["roll", "--config", &fixture("white_vs_white.yaml"), "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("wounds="))
        .stdout(predicate::str::contains("suppressed="));
}

#[test]
fn roll_is_repeatable_for_a_seed() {
    let run = || {
        attack_sim()
            .args(["roll", "--config", &fixture("white_vs_white.yaml"), "--seed", "9"])
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn exact_evaluation_text_report() {
    attack_sim()
        .args(["evaluate", "--config", &fixture("white_vs_white.yaml"), "--mode", "exact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exact over"))
        .stdout(predicate::str::contains("defender   mean=1.0417"))
        .stdout(predicate::str::contains("P(wounds >= 1)"));
}

#[test]
fn sampled_evaluation_json() {
    attack_sim()
        .args([
            "evaluate",
            "--config",
            &fixture("white_vs_white.yaml"),
            "--iterations",
            "500",
            "--seed",
            "1",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"sampled\""))
        .stdout(predicate::str::contains("\"suppression_chance\""));
}

#[test]
fn bom_prefixed_json_is_accepted() {
    attack_sim()
        .args(["evaluate", "--config", &fixture("bom_melee.json"), "--mode", "exact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("value ratio=n/a"));
}

#[test]
fn missing_die_colour_fails_with_context() {
    attack_sim()
        .args(["roll", "--config", &fixture("missing_die.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_die.json"))
        .stderr(predicate::str::contains("die"));
}

#[test]
fn zero_iterations_is_reported() {
    attack_sim()
        .args([
            "evaluate",
            "--config",
            &fixture("white_vs_white.yaml"),
            "--iterations",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("iterations"));
}

#[test]
fn dump_prints_a_loadable_context() {
    attack_sim()
        .arg("dump")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"attacker\""))
        .stdout(predicate::str::contains("\"guardian\""));
}
