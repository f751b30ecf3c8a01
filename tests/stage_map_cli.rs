use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const HEADER: &str = "dv_m_s,payload_t,variant,engine,count,mass_t,cost,feasible";

#[test]
fn stage_map_streams_every_cell_to_stdout() {
    let output = Command::cargo_bin("stage_map")
        .expect("stage_map bin")
        .args([
            "--settings",
            "configs/run.toml",
            "--span",
            "3",
            "--output",
            "-",
        ])
        .output()
        .expect("run stage_map");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], HEADER);
    assert_eq!(lines.len(), 1 + 9);
    for row in &lines[1..] {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 8, "row `{row}`");
        let feasible = fields[7] == "true";
        assert_eq!(feasible, fields[2] != "-1", "row `{row}`");
    }
    // 100 m/s with a 0.1 t payload is always reachable.
    assert!(lines[1].ends_with("true"), "first row `{}`", lines[1]);

    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("Xenon"));
}

#[test]
fn stage_map_writes_csv_and_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("maps/vac.csv");

    Command::cargo_bin("stage_map")
        .expect("stage_map bin")
        .args([
            "--span",
            "2",
            "--payload",
            "1",
            "10",
            "--delta-v",
            "500",
            "1500",
            "--objective",
            "cost",
            "--summary",
            "--output",
            csv_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 4 cells"));

    let csv = fs::read_to_string(&csv_path).expect("csv");
    assert_eq!(csv.lines().count(), 5);

    let summary_path = dir.path().join("maps/vac_summary.json");
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(summary_path).expect("summary")).unwrap();
    assert_eq!(summary["objective"], "cost");
    assert_eq!(summary["cells"], 4);
    assert_eq!(summary["feasible_cells"], 4);
}

#[test]
fn stage_map_rejects_an_unknown_family() {
    Command::cargo_bin("stage_map")
        .expect("stage_map bin")
        .args(["--family", "Monoprop", "--output", "-"])
        .assert()
        .failure();
}

#[test]
fn stage_plot_refuses_a_map_without_feasible_cells() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("empty.csv");
    fs::write(
        &csv_path,
        format!("{HEADER}\n100.000,0.100000,-1,,0,inf,inf,false\n"),
    )
    .unwrap();

    Command::cargo_bin("stage_plot")
        .expect("stage_plot bin")
        .args([
            "--input",
            csv_path.to_str().unwrap(),
            "--output",
            dir.path().join("empty.png").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No feasible cells"));
}
