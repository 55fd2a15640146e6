use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SIGNER: &str = "0x0909090909090909090909090909090909090909";

fn bills(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bills").unwrap();
    cmd.env("PRIVATE_BILLS_DATA_DIR", dir.path())
        .env_remove("PRIVATE_BILLS_PASSPHRASE")
        .env_remove("RUST_LOG");
    cmd
}

/// Initialized data dir with a deployed contract and an active signer
fn deployed() -> TempDir {
    let dir = TempDir::new().unwrap();
    bills(&dir).arg("init").assert().success();
    bills(&dir)
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("PrivateBills deployed to 0x"));
    bills(&dir)
        .args(["account", "use", SIGNER])
        .assert()
        .success();
    dir
}

fn add(dir: &TempDir, amount: &str, side: &str, tag: &str, date: &str) {
    bills(dir)
        .args(["record", "add", amount, side, "--tag", tag, "--date", date])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded"))
        .stdout(predicate::str::contains("addRecord completed"));
}

#[test]
fn test_init_creates_data_dir() {
    let dir = TempDir::new().unwrap();
    bills(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));

    assert!(dir.path().join("config.json").exists());
    assert!(dir.path().join("deployments.json").exists());
}

#[test]
fn test_balance_without_deployment_is_advisory() {
    let dir = TempDir::new().unwrap();
    bills(&dir).arg("init").assert().success();
    bills(&dir)
        .args(["account", "use", SIGNER])
        .assert()
        .success();

    bills(&dir)
        .arg("balance")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Note: PrivateBills deployment not found for chainId=31337.",
        ));
}

#[test]
fn test_balance_without_signer_is_advisory() {
    let dir = TempDir::new().unwrap();
    bills(&dir).arg("init").assert().success();
    bills(&dir).arg("deploy").assert().success();

    bills(&dir)
        .args(["balance", "--decrypt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No signer selected"));
}

#[test]
fn test_fresh_ledger_balance_is_zero() {
    let dir = deployed();
    bills(&dir)
        .args(["balance", "--decrypt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balance:"))
        .stdout(predicate::str::contains("$0"));
}

#[test]
fn test_records_flow_through_to_decrypted_totals() {
    let dir = deployed();
    add(&dir, "3000", "--income", "Salary", "2024-01-15");
    add(&dir, "1200", "--expense", "Rent", "2024-01-20");

    bills(&dir)
        .arg("balance")
        .assert()
        .success()
        .stdout(predicate::str::contains("***"));

    bills(&dir)
        .args(["balance", "--decrypt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$1800"));

    bills(&dir)
        .args(["monthly", "--month", "2024-01", "--decrypt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Monthly Summary: 2024-01"))
        .stdout(predicate::str::contains("$1800"))
        .stdout(predicate::str::contains("Warning").not());

    bills(&dir)
        .args(["report", "expenses", "--month", "2024-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rent"))
        .stdout(predicate::str::contains("$1200"))
        .stdout(predicate::str::contains("100%"));

    bills(&dir)
        .args(["record", "list", "--decrypt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Salary"))
        .stdout(predicate::str::contains("+$3000"))
        .stdout(predicate::str::contains("-$1200"));

    bills(&dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("CONFIRMED"));
}

#[test]
fn test_report_export_json() {
    let dir = deployed();
    add(&dir, "40", "--expense", "Shopping", "2024-03-02");
    let output = dir.path().join("report.json");

    bills(&dir)
        .args(["report", "expenses", "--month", "2024-03", "--format", "json", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("report exported to"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["items"].as_array().unwrap().len(), 8);
}

#[test]
fn test_record_add_requires_a_side() {
    let dir = deployed();
    bills(&dir)
        .args(["record", "add", "10", "--tag", "Rent"])
        .assert()
        .failure();
}

#[test]
fn test_record_add_rejects_tag_of_other_side() {
    let dir = deployed();
    bills(&dir)
        .args(["record", "add", "10", "--income", "--tag", "Rent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
fn test_network_switch_hides_deployment() {
    let dir = deployed();
    bills(&dir)
        .args(["network", "use", "11155111"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "PrivateBills deployment not found for chainId=11155111",
        ));

    bills(&dir)
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Only the local devnet"));
}

#[test]
fn test_sealed_signature_store() {
    let dir = deployed();
    bills(&dir)
        .args(["encrypt", "enable"])
        .env("PRIVATE_BILLS_PASSPHRASE", "correct horse battery")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encryption enabled successfully!"));
    add(&dir, "5", "--income", "Bonus", "2024-01-02");

    bills(&dir)
        .args(["balance", "--decrypt"])
        .env("PRIVATE_BILLS_PASSPHRASE", "correct horse battery")
        .assert()
        .success()
        .stdout(predicate::str::contains("$5"));

    let stored = std::fs::read_to_string(dir.path().join("signatures.json")).unwrap();
    assert!(stored.contains("sealed"));

    bills(&dir)
        .args(["balance", "--decrypt"])
        .env("PRIVATE_BILLS_PASSPHRASE", "wrong passphrase")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid passphrase"));
}

#[test]
fn test_tags_lists_both_sides() {
    let dir = TempDir::new().unwrap();
    bills(&dir)
        .arg("tags")
        .assert()
        .success()
        .stdout(predicate::str::contains("Food & Dining"))
        .stdout(predicate::str::contains("Investment"));
}
