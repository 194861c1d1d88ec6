use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const STATEMENT: &str = "Descrição;Valor;Data;Tipo;Forma de pagamento\n\
                         Dízimo João;450,00;25/12/2023;Entrada;Pix\n\
                         ok;ok\n\
                         Conta de luz;120,50;28/12/2023;Saída;Cartão\n";

struct Workspace {
    home: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            home: tempfile::tempdir().unwrap(),
        };
        let data_dir = ws.home.path().join("data");
        ws.cmd()
            .args(["init", "--data-dir", data_dir.to_str().unwrap(), "--church", "Igreja Betel"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized church-ledger"));
        ws
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("church-ledger").unwrap();
        cmd.env("HOME", self.home.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn write(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn import_with_yes_appends_and_reports_skipped_rows() {
    let ws = Workspace::new();
    let file = ws.write("dezembro.csv", STATEMENT.as_bytes());

    ws.cmd()
        .args(["import", file.to_str().unwrap(), "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("line 3: only 2 cell(s), need at least 3"))
        .stdout(predicate::str::contains("2 transaction(s) recognized."))
        .stdout(predicate::str::contains("2 transaction(s) appended."));

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dízimo João"))
        .stdout(predicate::str::contains("R$ 450,00"))
        .stdout(predicate::str::contains("2023-12-25"))
        .stdout(predicate::str::contains("Card"));

    ws.cmd()
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("R$ 329,50"));
}

#[test]
fn import_can_be_declined_at_the_prompt() {
    let ws = Workspace::new();
    let file = ws.write("dezembro.csv", STATEMENT.as_bytes());

    ws.cmd()
        .args(["import", file.to_str().unwrap()])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Append 2 transaction(s) to the ledger? [y/N]"))
        .stdout(predicate::str::contains("Import cancelled."));

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions found."));
}

#[test]
fn dry_run_writes_nothing() {
    let ws = Workspace::new();
    let file = ws.write("dezembro.csv", STATEMENT.as_bytes());

    ws.cmd()
        .args(["import", file.to_str().unwrap(), "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run: nothing was written."));

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions found."));
}

#[test]
fn same_file_is_not_imported_twice() {
    let ws = Workspace::new();
    let file = ws.write("dezembro.csv", STATEMENT.as_bytes());
    let path = file.to_str().unwrap();

    ws.cmd().args(["import", path, "--yes"]).assert().success();
    ws.cmd()
        .args(["import", path, "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already been imported"));
    ws.cmd()
        .args(["import", path, "--yes", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 transaction(s) appended."));
}

#[test]
fn unrecognized_headers_explain_what_is_missing() {
    let ws = Workspace::new();
    let file = ws.write("membros.csv", b"Nome,Telefone,Email\nAna,1199,ana@x.com\n");

    ws.cmd()
        .args(["import", file.to_str().unwrap(), "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions could be recognized"))
        .stdout(predicate::str::contains("recognizable columns"));
}

#[test]
fn non_text_file_is_a_user_facing_error() {
    let ws = Workspace::new();
    let file = ws.write("extrato.csv", &[0x44, 0xe7, 0xe3, 0x6f, 0x3b, 0xff, 0x0a]);

    ws.cmd()
        .args(["import", file.to_str().unwrap(), "--yes"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Could not process the file"));
}

#[test]
fn manual_entry_and_delete() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["add", "Oferta missionária", "75,00", "--date", "2024-03-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added transaction 1: Oferta missionária R$ 75,00"));

    ws.cmd()
        .args(["list", "--search", "MISSION"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dízimos"));

    ws.cmd().args(["delete", "1"]).assert().success();
    ws.cmd()
        .args(["delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown transaction: 1"));
}

#[test]
fn manual_entry_rejects_zero_amount() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["add", "Oferta", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("amount must be greater than zero"));
}

#[test]
fn backup_writes_json_snapshot() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["add", "Dízimo Ana", "300", "--date", "2024-01-07"])
        .assert()
        .success();

    let out = ws.home.path().join("backup.json");
    ws.cmd()
        .args(["backup", "--output", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transactions: 1"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["church"], "Igreja Betel");
    assert_eq!(json["transactions"][0]["description"], "Dízimo Ana");
    assert_eq!(json["transactions"][0]["amount"], 300.0);
}

#[test]
fn status_shows_church_and_counts() {
    let ws = Workspace::new();
    let file = ws.write("dezembro.csv", STATEMENT.as_bytes());
    ws.cmd().args(["import", file.to_str().unwrap(), "-y"]).assert().success();

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Church:     Igreja Betel"))
        .stdout(predicate::str::contains("Transactions:  2"))
        .stdout(predicate::str::contains("Imports:       1"));
}
