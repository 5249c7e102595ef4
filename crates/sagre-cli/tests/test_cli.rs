use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn get_test_dir() -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests");
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_cli_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("stats_edges.txt");
    fs::write(&file, "0 1\n1 2\n2 0\n")?;

    let mut cmd = Command::cargo_bin("sagre")?;
    cmd.arg("stats").arg(&file);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nodes:      3"))
        .stdout(predicate::str::contains("Edges:      3"));

    fs::remove_file(file)?;
    Ok(())
}

#[test]
fn test_cli_stats_undirected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("stats_undirected.txt");
    fs::write(&file, "0 1\n")?;

    let mut cmd = Command::cargo_bin("sagre")?;
    cmd.arg("stats").arg(&file).arg("--undirected");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Edges:      2"));

    fs::remove_file(file)?;
    Ok(())
}

#[test]
fn test_cli_train_unsupervised_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("train_edges.txt");
    // Small ring.
    let edges: String = (0..6)
        .map(|i| format!("{} {}\n", i, (i + 1) % 6))
        .collect();
    fs::write(&file, edges)?;

    let mut cmd = Command::cargo_bin("sagre")?;
    cmd.arg("train-unsupervised")
        .arg(&file)
        .arg("--undirected")
        .arg("--dim")
        .arg("8")
        .arg("--output-dims")
        .arg("6,4")
        .arg("--fanouts")
        .arg("2,2")
        .arg("--batch-size")
        .arg("4")
        .arg("--epochs")
        .arg("1");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("final loss"));

    fs::remove_file(file)?;
    Ok(())
}

#[test]
fn test_cli_train_supervised_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let edges = dir.join("sup_edges.txt");
    let labels = dir.join("sup_labels.txt");

    fs::write(&edges, "0 1\n1 0\n2 3\n3 2\n1 2\n")?;
    fs::write(&labels, "0 0\n1 0\n2 1\n3 1\n")?;

    let mut cmd = Command::cargo_bin("sagre")?;
    cmd.arg("train-supervised")
        .arg(&edges)
        .arg("--labels")
        .arg(&labels)
        .arg("--classes")
        .arg("2")
        .arg("--dim")
        .arg("4")
        .arg("--output-dims")
        .arg("4")
        .arg("--fanouts")
        .arg("2")
        .arg("--batch-size")
        .arg("2")
        .arg("--epochs")
        .arg("2");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("train accuracy"));

    fs::remove_file(edges)?;
    fs::remove_file(labels)?;
    Ok(())
}

#[test]
fn test_cli_rejects_bad_edge_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("bad_edges.txt");
    fs::write(&file, "0 1\nnonsense\n")?;

    let mut cmd = Command::cargo_bin("sagre")?;
    cmd.arg("stats").arg(&file);
    cmd.assert().failure();

    fs::remove_file(file)?;
    Ok(())
}
