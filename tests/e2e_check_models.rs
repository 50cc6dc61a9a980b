use serial_test::serial;
use std::fs;
use std::process::Command;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &TempDir, base_url: &str) -> std::path::PathBuf {
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "ollama_base_url = \"{base_url}\"\nmodels = [\"deepseek-r1:1.5b\", \"deepseek-r1:3b\"]\n"
        ),
    )
    .expect("write config");
    config_path
}

fn codebuddy(dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_codebuddy"));
    command
        .current_dir(dir.path())
        .env_remove("OLLAMA_BASE_URL")
        .env_remove("CODEBUDDY_MODEL")
        .env_remove("CODEBUDDY_TEMPERATURE")
        .env("XDG_CONFIG_HOME", dir.path())
        .env("XDG_STATE_HOME", dir.path());
    command
}

#[test]
#[serial]
fn check_reports_installed_models() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "deepseek-r1:1.5b", "size": 1_100_000_000u64}]
            })))
            .mount(&server)
            .await;
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = write_config(&dir, &server.uri());
    let output = codebuddy(&dir)
        .arg("--config")
        .arg(&config_path)
        .arg("--check")
        .output()
        .expect("run codebuddy");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains(&format!("Ollama server: {}", server.uri())));
    assert!(stdout.contains("* deepseek-r1:1.5b (installed)"));
    assert!(stdout.contains("deepseek-r1:3b (not installed, run: ollama pull deepseek-r1:3b)"));
}

#[test]
#[serial]
fn check_fails_when_server_is_unreachable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = write_config(&dir, "http://127.0.0.1:9");
    let output = codebuddy(&dir)
        .arg("--config")
        .arg(&config_path)
        .arg("--check")
        .output()
        .expect("run codebuddy");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to query models from http://127.0.0.1:9"));
}

#[test]
#[serial]
fn unknown_cli_model_is_rejected_before_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = write_config(&dir, "http://127.0.0.1:9");
    let output = codebuddy(&dir)
        .arg("--config")
        .arg(&config_path)
        .args(["--model", "mistral", "--check"])
        .output()
        .expect("run codebuddy");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid --model: unknown model 'mistral'"));
}
