use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dumbbell-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run(args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_dumbbell_vegas"))
        .args(args)
        .output()
        .expect("run dumbbell_vegas");
    assert!(
        output.status.success(),
        "dumbbell_vegas failed:\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).expect("read output json");
    serde_json::from_str(&text).expect("parse output json")
}

#[test]
fn dump_config_prints_default_scenario() {
    let output = run(&["--dump-config"]);
    let cfg: Value = serde_json::from_slice(&output.stdout).expect("config json");
    assert_eq!(cfg["stop"], "10s");
    assert_eq!(cfg["tcp"]["variant"], "vegas");
    assert_eq!(cfg["flows"].as_array().unwrap().len(), 3);
    assert_eq!(cfg["flows"][0]["port"], 50000);
    assert_eq!(cfg["animation"]["file"], "dumbbell_vegas_forward_anim.json");
    assert_eq!(cfg["flow_monitor"]["file"], "dumbbell_vegas_forward_flow.json");
}

#[test]
fn dump_config_applies_overrides() {
    let output = run(&[
        "--dump-config",
        "--stop",
        "4s",
        "--tcp-variant",
        "new-reno",
        "--data-rate",
        "2Mbps",
        "--packet-size",
        "1024",
        "--no-anim",
    ]);
    let cfg: Value = serde_json::from_slice(&output.stdout).expect("config json");
    assert_eq!(cfg["stop"], "4s");
    assert_eq!(cfg["tcp"]["variant"], "new_reno");
    assert_eq!(cfg["onoff"]["data_rate"], "2Mbps");
    assert_eq!(cfg["onoff"]["packet_size"], 1024);
    assert_eq!(cfg["animation"]["enabled"], false);
    assert_eq!(cfg["animation"]["counters_stop"], "10s");
    assert_eq!(cfg["flow_monitor"]["enabled"], true);
}

#[test]
fn short_run_writes_animation_and_flow_monitor_files() {
    let dir = unique_temp_dir("cli-run");
    let anim = dir.join("anim.json");
    let flow = dir.join("flow.json");
    let report = dir.join("report.json");

    let output = run(&[
        "--stop",
        "2s",
        "--anim-file",
        anim.to_str().unwrap(),
        "--flow-file",
        flow.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&format!("Animation Trace file created:{}", anim.display())),
        "stdout:\n{stdout}"
    );
    assert!(stdout.contains(&format!("Flow monitor file created:{}", flow.display())));
    assert!(stdout.lines().any(|l| l.starts_with("done @ 2s")));

    let events = read_json(&anim);
    let events = events.as_array().expect("event array");
    assert_eq!(events[0]["kind"], "meta");
    assert_eq!(events[0]["nodes"].as_array().unwrap().len(), 8);
    assert!(events.iter().any(|e| e["kind"] == "tx" && e["meta"].is_string()));
    assert!(events.iter().any(|e| e["kind"] == "ipv4_counters"));

    let flows = read_json(&flow);
    let stats = flows["flow_stats"].as_array().expect("flow_stats");
    assert!(stats.len() >= 3);
    assert!(stats.iter().all(|s| s["tx_packets"].as_u64() >= s["rx_packets"].as_u64()));
    assert!(!flows["classifier"].as_array().unwrap().is_empty());

    let report = read_json(&report);
    assert_eq!(report["end_time"], "2s");
    assert_eq!(report["installed"].as_array().unwrap().len(), 3);
    assert_eq!(report["tcp"][0]["congestion_control"], "Vegas");
}

#[test]
fn disabled_outputs_are_not_written() {
    let dir = unique_temp_dir("cli-quiet");
    let anim = dir.join("anim.json");
    let flow = dir.join("flow.json");

    let output = run(&[
        "--stop",
        "1500ms",
        "--no-anim",
        "--no-flowmon",
        "--anim-file",
        anim.to_str().unwrap(),
        "--flow-file",
        flow.to_str().unwrap(),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Animation Trace file created"));
    assert!(!stdout.contains("Flow monitor file created"));
    assert!(!anim.exists());
    assert!(!flow.exists());
}

#[test]
fn config_file_overrides_flows() {
    let dir = unique_temp_dir("cli-config");
    let config = dir.join("scenario.json");
    let report = dir.join("report.json");
    fs::write(
        &config,
        r#"{
    "stop": "1500ms",
    "flows": [
        { "protocol": "udp", "src": 0, "dst": 2, "port": 7000, "start": "100ms", "stop": "1s" }
    ],
    "animation": { "enabled": false },
    "flow_monitor": { "enabled": false }
}"#,
    )
    .expect("write config");

    run(&[
        "--config",
        config.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ]);
    let report = read_json(&report);
    let apps = report["apps"].as_array().unwrap();
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0]["app"], "sink");
    assert_eq!(apps[0]["port"], 7000);
    assert!(apps[0]["rx_bytes"].as_u64().unwrap() > 0);
    assert_eq!(apps[1]["remote"], "10.2.3.1:7000");
    assert!(report["tcp"].as_array().unwrap().is_empty());
}

#[test]
fn invalid_config_fails() {
    let dir = unique_temp_dir("cli-invalid");
    let config = dir.join("scenario.json");
    fs::write(
        &config,
        r#"{ "flows": [ { "protocol": "udp", "src": 5, "dst": 0, "port": 9, "start": "1s", "stop": "2s" } ] }"#,
    )
    .expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_dumbbell_vegas"))
        .args(["--config", config.to_str().unwrap()])
        .output()
        .expect("run dumbbell_vegas");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("left leaf index 5 out of range"));
}
