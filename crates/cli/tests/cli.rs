//! Black-box tests: run the `bloodbank` binary against a temporary database.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

use std::process::Command;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

struct TestState {
    dir: TempDir,
}

impl TestState {
    fn init() -> Result<Self> {
        let state = Self {
            dir: tempfile::tempdir()?,
        };
        state.cmd()?.arg("init").assert().success();
        Ok(state)
    }

    fn database_url(&self) -> String {
        format!("sqlite://{}", self.dir.path().join("bank.db").display())
    }

    fn cmd(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("bloodbank")?;
        cmd.env_remove("RUST_LOG")
            .env_remove("BLOODBANK_MAX_CONNECTIONS")
            .env("BLOODBANK_DATABASE_URL", self.database_url())
            .arg("--log-level")
            .arg("warn");
        Ok(cmd)
    }

    fn json(&self, args: &[&str]) -> Result<serde_json::Value> {
        let output = self.cmd()?.arg("--json").args(args).output()?;
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    fn register(&self, id: &str, name: &str, blood_type: &str) -> Result<()> {
        self.cmd()?
            .args(["donor", "register", id, "--name", name, "--age", "34"])
            .args(["--blood-type", blood_type])
            .args(["--phone", "0300-1234567", "--address", "12 Canal Road"])
            .assert()
            .success();
        Ok(())
    }
}

fn id_of(value: &serde_json::Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[test]
fn runs_help() -> Result<()> {
    Command::cargo_bin("bloodbank")?
        .arg("help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inventory"));
    Ok(())
}

#[test]
fn init_reports_every_blood_type_at_zero() -> Result<()> {
    let s = TestState::init()?;

    s.cmd()?
        .args(["inventory", "report"])
        .assert()
        .success()
        .stdout("A+\t0\nA-\t0\nB+\t0\nB-\t0\nAB+\t0\nAB-\t0\nO+\t0\nO-\t0\n");
    Ok(())
}

#[test]
fn adjustments_show_up_in_the_report() -> Result<()> {
    let s = TestState::init()?;

    s.cmd()?
        .args(["inventory", "adjust", "O+", "5"])
        .assert()
        .success()
        .stdout("O+: 0 -> 5\n");
    s.cmd()?
        .args(["inventory", "adjust", "o+", "-3"])
        .assert()
        .success()
        .stdout("O+: 5 -> 2\n");

    s.cmd()?
        .args(["inventory", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("O+\t2\n"));
    Ok(())
}

#[test]
fn overdraw_fails_and_keeps_stock() -> Result<()> {
    let s = TestState::init()?;
    s.cmd()?.args(["inventory", "adjust", "B-", "1"]).assert().success();

    s.cmd()?
        .args(["inventory", "adjust", "B-", "-2"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("insufficient B- stock"));

    s.cmd()?
        .args(["inventory", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("B-\t1\n"));
    Ok(())
}

#[test]
fn duplicate_donor_id_is_rejected() -> Result<()> {
    let s = TestState::init()?;
    s.register("D-100", "Ayesha Khan", "A+")?;

    s.cmd()?
        .args(["donor", "register", "D-100", "--name", "Other", "--age", "40"])
        .args(["--blood-type", "O-", "--phone", "0300", "--address", "Elsewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate"));

    s.cmd()?
        .args(["donor", "show", "D-100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ayesha Khan"));
    Ok(())
}

#[test]
fn donors_filter_by_blood_type() -> Result<()> {
    let s = TestState::init()?;
    s.register("D-1", "Zara", "AB+")?;
    s.register("D-2", "Ali", "AB+")?;
    s.register("D-3", "Maha", "O-")?;

    let listed = s.json(&["donor", "list", "--blood-type", "ab+"])?;
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Ali", "Zara"]);

    s.cmd()?
        .args(["donor", "counts"])
        .assert()
        .success()
        .stdout("AB+\t2\nO-\t1\n");
    Ok(())
}

#[test]
fn dates_can_be_cleared_on_update() -> Result<()> {
    let s = TestState::init()?;
    s.cmd()?
        .args(["donor", "register", "D-5", "--name", "Sana", "--age", "29"])
        .args(["--blood-type", "B+", "--phone", "0300", "--address", "Mall Road"])
        .args(["--last-donation", "2024-01-15"])
        .assert()
        .success();

    let donor = s.json(&["donor", "update", "D-5", "--clear-last-donation"])?;
    assert!(donor["last_donation"].is_null());
    s.cmd()?
        .args(["donor", "update", "D-5", "--last-donation", "2024-02-01"])
        .arg("--clear-last-donation")
        .assert()
        .failure();

    let request = s.json(&[
        "request",
        "create",
        "--name",
        "Omar",
        "--phone",
        "0312",
        "--blood-type",
        "B+",
        "--date-needed",
        "2030-01-01",
        "--message",
        "Ward 4, ask for Dr. Rana",
    ])?;
    assert_eq!(request["message"], "Ward 4, ask for Dr. Rana");

    let request_id = id_of(&request);
    let updated = s.json(&["request", "update", &request_id, "--clear-date-needed"])?;
    assert!(updated["date_needed"].is_null());
    assert_eq!(updated["message"], "Ward 4, ask for Dr. Rana");
    Ok(())
}

#[test]
fn invalid_blood_type_is_a_usage_error() -> Result<()> {
    let s = TestState::init()?;
    s.cmd()?
        .args(["inventory", "adjust", "C+", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("C+"));
    Ok(())
}

#[test]
fn outreach_flow_notifies_the_requester() -> Result<()> {
    let s = TestState::init()?;
    s.register("D-7", "Bilal", "A-")?;

    let request = s.json(&[
        "request",
        "create",
        "--name",
        "Hamza",
        "--phone",
        "0311-7654321",
        "--blood-type",
        "A-",
        "--location",
        "City Hospital",
    ])?;
    let request_id = id_of(&request);

    let matches = s.json(&["request", "matches", &request_id])?;
    assert_eq!(matches.as_array().unwrap().len(), 1);

    let sent = s.json(&["outreach", "send", "D-7", &request_id])?;
    assert_eq!(sent["status"], "pending");
    let donation_request_id = id_of(&sent);

    s.cmd()?
        .args(["outreach", "pending", "D-7"])
        .assert()
        .success()
        .stdout(predicate::str::contains(donation_request_id.as_str()));

    let accepted = s.json(&["outreach", "accept", &donation_request_id])?;
    assert_eq!(accepted["donation_request"]["status"], "accepted");
    assert!(accepted["notification"]["message"]
        .as_str()
        .unwrap()
        .contains("Bilal"));

    s.cmd()?
        .args(["outreach", "reject", &donation_request_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already accepted"));

    let notifications = s.json(&["outreach", "notifications", &request_id])?;
    assert_eq!(notifications.as_array().unwrap().len(), 1);

    s.cmd()?
        .args(["request", "delete", &request_id])
        .assert()
        .success();
    s.cmd()?
        .args(["outreach", "pending", "D-7"])
        .assert()
        .success()
        .stdout("");
    Ok(())
}
