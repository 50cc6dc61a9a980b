use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::chat::controller::DEFAULT_REQUEST_TIMEOUT;
use crate::chat::model::{DEFAULT_MODELS, ModelCatalog};
use crate::llm::ollama::DEFAULT_OLLAMA_BASE_URL;
use crate::llm::provider::DEFAULT_TEMPERATURE;

const CONFIG_DIR_NAME: &str = "codebuddy";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub ollama_base_url: String,
    pub models: ModelCatalog,
    pub default_model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub preset: ThemePreset,
    pub styles: HashMap<ThemeToken, StyleOverride>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preset: ThemePreset::Default,
            styles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemePreset {
    Default,
    Light,
    HighContrast,
}

impl FromStr for ThemePreset {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "default" => Ok(Self::Default),
            "light" => Ok(Self::Light),
            "high-contrast" => Ok(Self::HighContrast),
            _ => Err(format!("unknown preset '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeToken {
    Title,
    Caption,
    UserPrompt,
    AssistantPrompt,
    UserInput,
    AssistantText,
    AssistantWaiting,
    SystemInfo,
    SystemError,
    Status,
    InputBlock,
}

impl ThemeToken {
    pub fn all() -> &'static [ThemeToken] {
        &[
            Self::Title,
            Self::Caption,
            Self::UserPrompt,
            Self::AssistantPrompt,
            Self::UserInput,
            Self::AssistantText,
            Self::AssistantWaiting,
            Self::SystemInfo,
            Self::SystemError,
            Self::Status,
            Self::InputBlock,
        ]
    }
}

impl FromStr for ThemeToken {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "title" => Ok(Self::Title),
            "caption" => Ok(Self::Caption),
            "user_prompt" => Ok(Self::UserPrompt),
            "assistant_prompt" => Ok(Self::AssistantPrompt),
            "user_input" => Ok(Self::UserInput),
            "assistant_text" => Ok(Self::AssistantText),
            "assistant_waiting" => Ok(Self::AssistantWaiting),
            "system_info" => Ok(Self::SystemInfo),
            "system_error" => Ok(Self::SystemError),
            "status" => Ok(Self::Status),
            "input_block" => Ok(Self::InputBlock),
            _ => Err(format!("unknown token '{value}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOverride {
    pub fg: Option<HexColor>,
    pub bg: Option<HexColor>,
    pub modifiers: Option<Vec<ThemeModifier>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        const INVALID: &str = "invalid hex color, expected #RRGGBB";
        let digits = value.strip_prefix('#').ok_or_else(|| INVALID.to_string())?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(INVALID.to_string());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| INVALID.to_string())
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeModifier {
    Bold,
    Dim,
    Italic,
    Underlined,
    Reversed,
    CrossedOut,
}

impl FromStr for ThemeModifier {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "bold" => Ok(Self::Bold),
            "dim" => Ok(Self::Dim),
            "italic" => Ok(Self::Italic),
            "underlined" => Ok(Self::Underlined),
            "reversed" => Ok(Self::Reversed),
            "crossed_out" => Ok(Self::CrossedOut),
            _ => Err(format!("unknown modifier '{value}'")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    ollama_base_url: Option<String>,
    models: Option<Vec<String>>,
    default_model: Option<String>,
    temperature: Option<f32>,
    request_timeout_secs: Option<u64>,
    theme: Option<RawThemeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThemeConfig {
    name: Option<String>,
    styles: Option<HashMap<String, RawStyleOverride>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStyleOverride {
    fg: Option<String>,
    bg: Option<String>,
    modifiers: Option<Vec<String>>,
}

impl AppConfig {
    /// Resolves the effective configuration: defaults, then the TOML file,
    /// then environment variables (a `.env` file never overrides real ones).
    pub fn load_with_path(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    bail!(
                        "Failed to load config {}: file does not exist",
                        path.display()
                    );
                }
                path.to_path_buf()
            }
            None => discover_config_path()?,
        };
        let file_config = load_file_config(&config_path)?.unwrap_or_default();

        dotenvy::dotenv().ok();

        let ollama_base_url = env_non_empty("OLLAMA_BASE_URL")
            .or_else(|| file_config.ollama_base_url.as_deref().and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());

        let models = match &file_config.models {
            Some(names) => ModelCatalog::new(names)
                .map_err(|err| config_error(&config_path, "models", &err.to_string()))?,
            None => ModelCatalog::new(DEFAULT_MODELS)
                .map_err(|err| config_error(&config_path, "models", &err.to_string()))?,
        };

        let default_model = match env_non_empty("CODEBUDDY_MODEL") {
            Some(name) => validate_model(&models, &name, &config_path, "CODEBUDDY_MODEL")?,
            None => match file_config.default_model.as_deref().and_then(non_empty) {
                Some(name) => validate_model(&models, &name, &config_path, "default_model")?,
                None => models.default_selector().name().to_string(),
            },
        };

        let temperature = match env_non_empty("CODEBUDDY_TEMPERATURE") {
            Some(raw) => {
                let value = raw.parse::<f32>().map_err(|_| {
                    config_error(&config_path, "CODEBUDDY_TEMPERATURE", "invalid number")
                })?;
                validate_temperature(value, &config_path, "CODEBUDDY_TEMPERATURE")?
            }
            None => match file_config.temperature {
                Some(value) => validate_temperature(value, &config_path, "temperature")?,
                None => DEFAULT_TEMPERATURE,
            },
        };

        let request_timeout = match file_config.request_timeout_secs {
            Some(0) => {
                return Err(config_error(
                    &config_path,
                    "request_timeout_secs",
                    "must be greater than zero",
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let theme = validate_theme(file_config.theme.as_ref(), &config_path)?;

        Ok(Self {
            config_path,
            ollama_base_url,
            models,
            default_model,
            temperature,
            request_timeout,
            theme,
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("Failed to resolve config path: HOME directory is unavailable"))?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text)
        .map(Some)
        .map_err(|err| anyhow!("Failed to load config {}: {err}", config_path.display()))
}

fn validate_model(
    models: &ModelCatalog,
    name: &str,
    config_path: &Path,
    key_path: &str,
) -> Result<String> {
    models
        .select(name)
        .map(|selector| selector.name().to_string())
        .map_err(|err| config_error(config_path, key_path, &err.to_string()))
}

fn validate_temperature(value: f32, config_path: &Path, key_path: &str) -> Result<f32> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(config_error(
            config_path,
            key_path,
            &format!("{value} is outside 0.0..=1.0"),
        ))
    }
}

fn validate_theme(raw_theme: Option<&RawThemeConfig>, config_path: &Path) -> Result<ThemeConfig> {
    let Some(theme) = raw_theme else {
        return Ok(ThemeConfig::default());
    };

    let mut config = ThemeConfig::default();

    if let Some(name) = &theme.name {
        config.preset = ThemePreset::from_str(name)
            .map_err(|reason| config_error(config_path, "theme.name", &reason))?;
    }

    if let Some(styles) = &theme.styles {
        for (token_name, raw_style) in styles {
            let token = ThemeToken::from_str(token_name).map_err(|reason| {
                config_error(config_path, &format!("theme.styles.{token_name}"), &reason)
            })?;

            let fg = parse_color(raw_style.fg.as_deref(), config_path, token_name, "fg")?;
            let bg = parse_color(raw_style.bg.as_deref(), config_path, token_name, "bg")?;
            let modifiers =
                parse_modifiers(raw_style.modifiers.as_deref(), config_path, token_name)?;

            config
                .styles
                .insert(token, StyleOverride { fg, bg, modifiers });
        }
    }

    Ok(config)
}

fn parse_color(
    value: Option<&str>,
    config_path: &Path,
    token_name: &str,
    field_name: &str,
) -> Result<Option<HexColor>> {
    let Some(value) = value else {
        return Ok(None);
    };

    HexColor::from_str(value).map(Some).map_err(|reason| {
        config_error(
            config_path,
            &format!("theme.styles.{token_name}.{field_name}"),
            &reason,
        )
    })
}

fn parse_modifiers(
    values: Option<&[String]>,
    config_path: &Path,
    token_name: &str,
) -> Result<Option<Vec<ThemeModifier>>> {
    let Some(values) = values else {
        return Ok(None);
    };

    values
        .iter()
        .map(|value| {
            ThemeModifier::from_str(value).map_err(|reason| {
                config_error(
                    config_path,
                    &format!("theme.styles.{token_name}.modifiers"),
                    &reason,
                )
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().as_deref().and_then(non_empty)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, HexColor, ThemeConfig, ThemePreset, ThemeToken};
    use crate::llm::ollama::DEFAULT_OLLAMA_BASE_URL;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn reset_vars() {
        unsafe {
            env::remove_var("OLLAMA_BASE_URL");
            env::remove_var("CODEBUDDY_MODEL");
            env::remove_var("CODEBUDDY_TEMPERATURE");
            env::remove_var("XDG_CONFIG_HOME");
        }
    }

    fn with_cwd<T>(path: &Path, f: impl FnOnce() -> T) -> T {
        let cwd = env::current_dir().expect("current dir");
        env::set_current_dir(path).expect("set current dir");
        let result = f();
        env::set_current_dir(cwd).expect("restore current dir");
        result
    }

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let config_dir = root.join("codebuddy");
        fs::create_dir_all(&config_dir).expect("create config dir");
        let path = config_dir.join("config.toml");
        fs::write(&path, body).expect("write config");
        path
    }

    fn load_in(root: &Path) -> anyhow::Result<AppConfig> {
        unsafe {
            env::set_var("XDG_CONFIG_HOME", root);
        }
        with_cwd(root, || AppConfig::load_with_path(None))
    }

    #[test]
    #[serial]
    fn load_uses_defaults_without_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.ollama_base_url, DEFAULT_OLLAMA_BASE_URL);
        assert_eq!(
            cfg.models.names(),
            ["deepseek-r1:1.5b", "deepseek-r1:3b"]
        );
        assert_eq!(cfg.default_model, "deepseek-r1:1.5b");
        assert_eq!(cfg.temperature, 0.3);
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
        assert_eq!(cfg.theme, ThemeConfig::default());
        assert_eq!(
            cfg.config_path,
            tmp.path().join("codebuddy").join("config.toml")
        );
    }

    #[test]
    #[serial]
    fn load_reads_file_values() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
ollama_base_url = "http://gpu-box:11434"
models = ["qwen2.5-coder:7b", "llama3"]
default_model = "llama3"
temperature = 0.1
request_timeout_secs = 30
"#,
        );
        reset_vars();

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.ollama_base_url, "http://gpu-box:11434");
        assert_eq!(cfg.models.names(), ["qwen2.5-coder:7b", "llama3"]);
        assert_eq!(cfg.default_model, "llama3");
        assert_eq!(cfg.temperature, 0.1);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn load_env_overrides_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
ollama_base_url = "http://from-file:11434"
temperature = 0.9
"#,
        );
        reset_vars();
        unsafe {
            env::set_var("OLLAMA_BASE_URL", "http://from-env:11434");
            env::set_var("CODEBUDDY_MODEL", "deepseek-r1:3b");
            env::set_var("CODEBUDDY_TEMPERATURE", "0.5");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        reset_vars();
        assert_eq!(cfg.ollama_base_url, "http://from-env:11434");
        assert_eq!(cfg.default_model, "deepseek-r1:3b");
        assert_eq!(cfg.temperature, 0.5);
    }

    #[test]
    #[serial]
    fn dotenv_does_not_override_real_environment() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(
            tmp.path().join(".env"),
            "OLLAMA_BASE_URL=http://dotenv:11434\n",
        )
        .expect("write env file");
        reset_vars();
        unsafe {
            env::set_var("OLLAMA_BASE_URL", "http://shell:11434");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        reset_vars();
        assert_eq!(cfg.ollama_base_url, "http://shell:11434");
    }

    #[test]
    #[serial]
    fn explicit_path_must_exist() {
        reset_vars();
        let tmp = tempfile::tempdir().expect("tempdir");
        let missing = tmp.path().join("nope.toml");

        let err = AppConfig::load_with_path(Some(&missing)).expect_err("missing file");
        assert!(err.to_string().contains("file does not exist"));
    }

    #[test]
    #[serial]
    fn explicit_path_skips_discovery() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("custom.toml");
        fs::write(&path, r#"default_model = "deepseek-r1:3b""#).expect("write config");
        reset_vars();

        let cfg = with_cwd(tmp.path(), || {
            AppConfig::load_with_path(Some(&path)).expect("load config")
        });
        assert_eq!(cfg.config_path, path);
        assert_eq!(cfg.default_model, "deepseek-r1:3b");
    }

    #[test]
    #[serial]
    fn load_fails_when_xdg_config_home_is_empty() {
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "   ");
        }

        let err = AppConfig::load_with_path(None).expect_err("load should fail");
        reset_vars();
        assert!(
            err.to_string()
                .contains("Failed to resolve config path: XDG_CONFIG_HOME is set but empty")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_root_key() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "api_key = \"x\"");
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(err.to_string().contains("Failed to load config"));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    #[serial]
    fn load_fails_when_default_model_is_not_listed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
models = ["llama3"]
default_model = "mistral"
"#,
        );
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("default_model: unknown model 'mistral' (available: llama3)")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_empty_model_list() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "models = [\"\", \" \"]");
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(err.to_string().contains("models: model allow-list is empty"));
    }

    #[test]
    #[serial]
    fn load_fails_on_out_of_range_temperature() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "temperature = 1.5");
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("temperature: 1.5 is outside 0.0..=1.0")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_unparsable_env_temperature() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        unsafe {
            env::set_var("CODEBUDDY_TEMPERATURE", "warm");
        }

        let err = load_in(tmp.path()).expect_err("load should fail");
        reset_vars();
        assert!(
            err.to_string()
                .contains("CODEBUDDY_TEMPERATURE: invalid number")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_zero_timeout() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "request_timeout_secs = 0");
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("request_timeout_secs: must be greater than zero")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_style_token() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r##"
[theme.styles.code_prompt]
fg = "#ffffff"
"##,
        );
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("theme.styles.code_prompt: unknown token 'code_prompt'")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_invalid_hex_color() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
[theme.styles.user_prompt]
fg = "red"
"#,
        );
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("theme.styles.user_prompt.fg: invalid hex color")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_modifier() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
[theme.styles.assistant_text]
modifiers = ["sparkly"]
"#,
        );
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("theme.styles.assistant_text.modifiers: unknown modifier 'sparkly'")
        );
    }

    #[test]
    #[serial]
    fn load_parses_theme_config_with_strong_types() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r##"
[theme]
name = "light"

[theme.styles.assistant_prompt]
fg = "#A0B1C2"
"##,
        );
        reset_vars();

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.theme.preset, ThemePreset::Light);
        let style = cfg
            .theme
            .styles
            .get(&ThemeToken::AssistantPrompt)
            .expect("assistant_prompt style");
        assert_eq!(
            style.fg,
            Some(HexColor {
                r: 0xA0,
                g: 0xB1,
                b: 0xC2
            })
        );
    }

    #[test]
    fn hex_color_rejects_malformed_values() {
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("123456".parse::<HexColor>().is_err());
        assert!("#12345G".parse::<HexColor>().is_err());
        assert!("#ééé".parse::<HexColor>().is_err());
        assert_eq!(
            "#0a0B0c".parse::<HexColor>(),
            Ok(HexColor {
                r: 0x0a,
                g: 0x0b,
                b: 0x0c
            })
        );
    }
}
