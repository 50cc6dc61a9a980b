use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "codebuddy", version)]
#[command(
    about = "Terminal chat with a coding assistant backed by a local Ollama server",
    long_about = "Terminal chat with a coding assistant backed by a local Ollama server\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/codebuddy/config.toml\n    2. ~/.config/codebuddy/config.toml\n\nEnvironment overrides: OLLAMA_BASE_URL, CODEBUDDY_MODEL, CODEBUDDY_TEMPERATURE, NO_COLOR"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Start with this model instead of the configured default.
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Report which allow-listed models the server has installed, then exit.
    #[arg(long)]
    pub check: bool,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn parse_defaults() {
        let args = CliArgs::try_parse_from(["codebuddy"]).expect("should parse");
        assert_eq!(args.config, None);
        assert_eq!(args.model, None);
        assert!(!args.check);
    }

    #[test]
    fn parse_config_flag() {
        let args =
            CliArgs::try_parse_from(["codebuddy", "--config", "/tmp/custom.toml"]).expect("parse");
        assert_eq!(
            args.config.as_deref(),
            Some(std::path::Path::new("/tmp/custom.toml"))
        );
    }

    #[test]
    fn parse_model_and_check_flags() {
        let args = CliArgs::try_parse_from(["codebuddy", "--model", "deepseek-r1:3b", "--check"])
            .expect("parse");
        assert_eq!(args.model.as_deref(), Some("deepseek-r1:3b"));
        assert!(args.check);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(CliArgs::try_parse_from(["codebuddy", "--verbose"]).is_err());
    }
}
