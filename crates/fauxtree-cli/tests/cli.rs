use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fauxtree_cli_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn fauxtree() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fauxtree"))
}

#[test]
fn config_prints_defaults() {
    let output = fauxtree().arg("config").output().expect("run config");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("seed = 42"));
    assert!(stdout.contains("locale = \"en_US\""));
    assert!(stdout.contains("[features]"));
}

#[test]
fn generate_writes_run_directory() {
    let out = temp_dir("generate");
    let output = fauxtree()
        .args(["generate", "--seed", "3", "--max-generations", "2", "--format", "json"])
        .arg("--out")
        .arg(&out)
        .output()
        .expect("run generate");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let run_dir = stdout
        .lines()
        .find_map(|line| line.strip_prefix("run_dir="))
        .map(PathBuf::from)
        .expect("run_dir line");
    for file in ["options.json", "graph.json", "generation_report.json", "logs.jsonl"] {
        assert!(run_dir.join(file).exists(), "{file} missing");
    }
    let logs = fs::read_to_string(run_dir.join("logs.jsonl")).expect("read logs");
    assert!(logs.contains("generation completed"));

    fs::remove_dir_all(&out).ok();
}

#[test]
fn generate_with_config_file() {
    let out = temp_dir("config");
    let config = out.join("fauxtree.toml");
    fs::write(
        &config,
        format!(
            "out_dir = {:?}\nmax_generations = 1\nformat = \"csv\"\n\n[features]\nnotes = false\n",
            out.display().to_string()
        ),
    )
    .expect("write config");

    let output = fauxtree()
        .args(["generate", "--config"])
        .arg(&config)
        .output()
        .expect("run generate");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let run_dir = stdout
        .lines()
        .find_map(|line| line.strip_prefix("run_dir="))
        .map(PathBuf::from)
        .expect("run_dir line");
    assert!(run_dir.starts_with(&out));
    assert!(run_dir.join("people.csv").exists());

    fs::remove_dir_all(&out).ok();
}

#[test]
fn scan_media_reports_inventory() {
    let media = temp_dir("media");
    let dir = media.join("family").join("grayscale");
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join("a.jpg"), b"a").expect("write");
    fs::write(dir.join("b.png"), b"b").expect("write");

    let output = fauxtree()
        .arg("scan-media")
        .arg(&media)
        .output()
        .expect("run scan-media");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("family/grayscale\t2"));
    assert!(stdout.contains("total\t2"));

    fs::remove_dir_all(&media).ok();
}
