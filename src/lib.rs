pub mod chat;
pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod trace;

use anyhow::{Context, Result, anyhow};
use chat::{ChatSession, ControllerConfig, SYSTEM_INSTRUCTION, TurnController};
use cli::theme::Theme;
use cli::{AppState, CliArgs, models_report, run_repl};
use config::AppConfig;
use http::client::HttpClient;
use llm::ollama::OllamaProvider;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use trace::SessionTrace;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(args: CliArgs) -> Result<()> {
    let config = AppConfig::load_with_path(args.config.as_deref())?;
    let initial_model = resolve_initial_model(&config, args.model.as_deref())?;

    if args.check {
        return check_models(&config, &initial_model).await;
    }

    let session_id = generate_session_id();
    let trace = SessionTrace::create(&session_id)?;
    trace.log_session(&format!(
        "config {} base_url {} temperature {}",
        config.config_path.display(),
        config.ollama_base_url,
        config.temperature
    ));
    let provider = build_provider(&config, Some(trace.clone()))?;

    let mut session = ChatSession::new(config.models.clone());
    session.select_model(&initial_model)?;
    let controller = TurnController::new(
        provider,
        ControllerConfig {
            temperature: config.temperature,
            request_timeout: config.request_timeout,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        },
    );
    let theme = Theme::from_config(colors_enabled(), &config.theme);

    let mut app_state = AppState::new(session, controller, trace, theme, session_id);
    run_repl(&mut app_state).await
}

async fn check_models(config: &AppConfig, current: &str) -> Result<()> {
    let provider = build_provider(config, None)?;
    let installed = provider
        .list_models()
        .await
        .with_context(|| format!("Failed to query models from {}", provider.base_url()))?;

    println!("Ollama server: {}", provider.base_url());
    println!("{}", models_report(config.models.names(), &installed, current));
    Ok(())
}

fn build_provider(config: &AppConfig, trace: Option<SessionTrace>) -> Result<OllamaProvider> {
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let mut http = HttpClient::new(client);
    if let Some(trace) = trace {
        http = http.with_trace(trace);
    }

    Ok(OllamaProvider::new(http, &config.ollama_base_url))
}

fn resolve_initial_model(config: &AppConfig, cli_model: Option<&str>) -> Result<String> {
    match cli_model {
        Some(name) => config
            .models
            .select(name)
            .map(|selector| selector.name().to_string())
            .map_err(|err| anyhow!("Invalid --model: {err}")),
        None => Ok(config.default_model.clone()),
    }
}

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none_or(|value| value.is_empty())
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
