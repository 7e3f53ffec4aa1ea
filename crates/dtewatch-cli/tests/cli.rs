//! End-to-end tests for the `dtewatch` binary.

use assert_cmd::Command;
use predicates::prelude::*;

const BOLETA: &str = "\
->Boleta<-
39;1001;2024-05-01;1;;;;;66666666-6;;CLIENTE FINAL;PARTICULAR;SIN DIRECCION;SANTIAGO
->BoletaTotales<-
x;x;x;10000
->BoletaDetalle<-
1;x;Pan Amasado;0;2;3000;x;6000;x;UND
2;x;Leche Entera;0;4;1000;x;4000;x;UND
";

#[test]
fn config_path_prints_a_location() {
    Command::cargo_bin("dtewatch")
        .unwrap()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"));
}

#[test]
fn process_missing_input_fails() {
    Command::cargo_bin("dtewatch")
        .unwrap()
        .args(["process", "/no/such/venta.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn dry_run_prints_the_assembled_payload() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("venta.txt");
    std::fs::write(&input, BOLETA).unwrap();

    let config = dir.path().join("config.json");
    std::fs::write(&config, "{}").unwrap();

    Command::cargo_bin("dtewatch")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["process", "--dry-run"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"TipoDTE\": 39")
                .and(predicate::str::contains("MontoPeriodo"))
                .and(predicate::str::contains("Pan Amasado")),
        );
}

#[test]
fn dry_run_rejects_files_without_a_known_header() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("otro.txt");
    std::fs::write(&input, "->Otro<-\n1;2;3\n").unwrap();

    let config = dir.path().join("config.json");
    std::fs::write(&config, "{}").unwrap();

    Command::cargo_bin("dtewatch")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["process", "--dry-run"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no reconocido"));
}

#[test]
fn log_without_database_reports_no_events() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("dtewatch")
        .unwrap()
        .arg("log")
        .arg("--log-db")
        .arg(dir.path().join("no-existe.db"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No hay eventos registrados."));
}
