#![cfg(all(unix, feature = "cli"))]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use worker_launcher::cli::{run_cli, Cli};
use worker_launcher::prelude::*;

use clap::Parser;

/// Writes each named variable of its own environment to `<dir>/<NAME>`,
/// byte for byte. Unset variables are written as `__UNSET__`.
const DUMP_SCRIPT: &str =
    r#"dir="$1"; shift; for k in "$@"; do eval "v=\${$k-__UNSET__}"; printf '%s' "$v" > "$dir/$k"; done"#;

const ALL_KEYS: &[&str] = &[
    keys::POSTGRES_DSN,
    keys::MINIO_ENDPOINT,
    keys::MINIO_ACCESS_KEY,
    keys::MINIO_SECRET_KEY,
    keys::MINIO_SECURE,
    keys::JOB_INPUT_BUCKET,
    keys::JOB_OUTPUT_BUCKET,
    keys::WORKER_KEY,
    keys::WORKER_DISPLAY_NAME,
    keys::WORKER_IP_ADDRESS,
    keys::WORKER_TAGS_JSON,
    keys::WORKER_CAPACITY_JSON,
    keys::IDLE_SLEEP_SEC,
    keys::KEEP_FRAMES_FOR_DEBUG,
    keys::HF_TOKEN,
];

fn dump_config(dir: &Path) -> LaunchConfig {
    let mut args = vec![
        "-c".to_string(),
        DUMP_SCRIPT.to_string(),
        "sh".to_string(),
        dir.display().to_string(),
    ];
    args.extend(ALL_KEYS.iter().map(|k| k.to_string()));

    LaunchConfigBuilder::new()
        .postgres_dsn("postgresql://worker:p@ss w'rd@db:5432/jobs")
        .minio("minio:9000", "access", "secret")
        .buckets("videos", "glb")
        .tags_json(r#"{"gpu": "RTX 4090", "quote": "it's \"fine\""}"#)
        .capacity_json(r#"{"max_jobs": 1}"#)
        .idle_sleep_sec("2")
        .keep_frames_for_debug("false")
        .hf_token("hf_test_token")
        .program("/bin/sh", args)
        .build()
}

fn read_dump(dir: &Path) -> BTreeMap<String, String> {
    ALL_KEYS
        .iter()
        .map(|k| {
            let value = fs::read_to_string(dir.join(k)).expect("child did not write variable");
            (k.to_string(), value)
        })
        .collect()
}

#[tokio::test]
async fn test_child_receives_exact_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = dump_config(dir.path());
    let identity = WorkerIdentity::resolve(&config.worker, "gpu-node-3");
    let launcher = Launcher::with_identity(&config, &identity);

    let outcome = launcher.run().await.expect("Failed to run worker");
    assert!(outcome.success());
    assert_eq!(outcome.exit_code(), 0);
    assert!(!outcome.interrupted);

    let dump = read_dump(dir.path());
    for (key, value) in launcher.environment().iter() {
        assert_eq!(dump.get(key).map(String::as_str), Some(value), "{}", key);
    }
    assert_eq!(dump[keys::WORKER_KEY], "gpu-node-3");
    assert_eq!(dump[keys::WORKER_DISPLAY_NAME], "DA3 Worker - gpu-node-3");
    assert_eq!(
        dump[keys::WORKER_TAGS_JSON],
        r#"{"gpu": "RTX 4090", "quote": "it's \"fine\""}"#
    );
    assert_eq!(dump[keys::WORKER_IP_ADDRESS], "__UNSET__");
}

#[tokio::test]
async fn test_relaunch_produces_identical_environment() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();

    let mut dumps = Vec::new();
    for dir in [&first_dir, &second_dir] {
        let config = dump_config(dir.path());
        let identity = WorkerIdentity::resolve(&config.worker, "node-a");
        Launcher::with_identity(&config, &identity)
            .run()
            .await
            .expect("Failed to run worker");
        dumps.push(read_dump(dir.path()));
    }

    assert_eq!(dumps[0], dumps[1]);
}

#[tokio::test]
async fn test_worker_settings_from_child_view() {
    let dir = tempfile::tempdir().unwrap();
    let config = dump_config(dir.path());
    let identity = WorkerIdentity::resolve(&config.worker, "gpu-node-3");
    Launcher::with_identity(&config, &identity)
        .run()
        .await
        .unwrap();

    let dump = read_dump(dir.path());
    let settings = WorkerSettings::from_lookup(
        |key| dump.get(key).filter(|v| *v != "__UNSET__").cloned(),
        "unused",
    )
    .expect("child environment should satisfy the worker");

    assert_eq!(settings.worker_key, "gpu-node-3");
    assert_eq!(settings.idle_sleep, Duration::from_secs(2));
    assert_eq!(settings.tags["gpu"], "RTX 4090");
    assert_eq!(settings.hf_token.as_deref(), Some("hf_test_token"));
}

#[tokio::test]
async fn test_exit_code_propagates() {
    let launcher = Launcher::new(
        LaunchSpec::new("/bin/sh").args(["-c", "exit 7"]),
        Environment::new(),
    );

    let outcome = launcher.run().await.unwrap();
    assert!(!outcome.success());
    assert_eq!(outcome.exit_code(), 7);
}

#[tokio::test]
async fn test_signal_death_maps_to_128_plus_signal() {
    let launcher = Launcher::new(
        LaunchSpec::new("/bin/sh").args(["-c", "kill -9 $$"]),
        Environment::new(),
    );

    let outcome = launcher.run().await.unwrap();
    assert_eq!(outcome.exit_code(), 137);
}

#[tokio::test]
async fn test_inherits_parent_environment_by_default() {
    std::env::set_var("WORKER_LAUNCHER_TEST_INHERITED", "1");
    let env: Environment = [(keys::WORKER_KEY, "node")].into_iter().collect();
    let script = r#"test -n "${WORKER_LAUNCHER_TEST_INHERITED+x}" && test "$WORKER_KEY" = node"#;

    let inherited = Launcher::new(LaunchSpec::new("/bin/sh").args(["-c", script]), env.clone());
    assert_eq!(inherited.run().await.unwrap().exit_code(), 0);

    let cleared = Launcher::new(
        LaunchSpec::new("/bin/sh").args(["-c", script]).clear_env(true),
        env,
    );
    assert_ne!(cleared.run().await.unwrap().exit_code(), 0);
}

#[tokio::test]
async fn test_configured_values_override_inherited() {
    // PATH is always inherited from the test runner; the configured value must win.
    let env: Environment = [("PATH", "/configured/bin:/usr/bin:/bin")].into_iter().collect();
    let launcher = Launcher::new(
        LaunchSpec::new("/bin/sh").args(["-c", r#"test "$PATH" = /configured/bin:/usr/bin:/bin"#]),
        env,
    );

    assert_eq!(launcher.run().await.unwrap().exit_code(), 0);
}

#[tokio::test]
async fn test_missing_worker_fails_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = dump_config(dir.path());
    config.launch.program = dir.path().join("no-such-worker").display().to_string();

    let identity = WorkerIdentity::resolve(&config.worker, "h");
    let err = Launcher::with_identity(&config, &identity)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, LauncherError::Spawn { .. }));
    assert_eq!(err.exit_code(), 127);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_cli_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("worker-launcher.toml");
    fs::write(
        &config_path,
        "[jobs]\ninput_bucket = \"cli-in\"\n[worker]\nip_address = \"10.0.0.9\"\n",
    )
    .unwrap();
    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();

    let mut argv = vec![
        "worker-launcher".to_string(),
        "--config".to_string(),
        config_path.display().to_string(),
        "--hostname".to_string(),
        "gpu-node-3".to_string(),
        "run".to_string(),
        "--".to_string(),
        "/bin/sh".to_string(),
        "-c".to_string(),
        DUMP_SCRIPT.to_string(),
        "sh".to_string(),
        out_dir.display().to_string(),
    ];
    argv.extend(ALL_KEYS.iter().map(|k| k.to_string()));

    let cli = Cli::try_parse_from(argv).expect("Failed to parse arguments");
    let code = run_cli(cli).await.expect("Failed to run launcher");
    assert_eq!(code, 0);

    let dump = read_dump(&out_dir);
    assert_eq!(dump[keys::WORKER_KEY], "gpu-node-3");
    assert_eq!(dump[keys::WORKER_DISPLAY_NAME], "DA3 Worker - gpu-node-3");
    assert_eq!(dump[keys::JOB_INPUT_BUCKET], "cli-in");
    assert_eq!(dump[keys::WORKER_IP_ADDRESS], "10.0.0.9");
    assert_eq!(dump[keys::MINIO_SECURE], "false");
}

#[tokio::test]
async fn test_cli_check_reports_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("worker-launcher.yaml");
    fs::write(&config_path, "worker:\n  idle_sleep_sec: soon\n").unwrap();

    let cli = Cli::try_parse_from([
        "worker-launcher",
        "--config",
        config_path.to_str().unwrap(),
        "--hostname",
        "h",
        "check",
    ])
    .unwrap();

    assert_eq!(run_cli(cli).await.unwrap(), 1);
}
