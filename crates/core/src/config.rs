use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notice::Destination;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub transport: TransportMode,
    pub bot_token: SecretString,
    pub app_token: Option<SecretString>,
    pub signing_secret: Option<SecretString>,
    pub emoji_channel_id: String,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Webhook,
    Socket,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Environment variable names holding credentials. The two transports were
/// deployed with different names and both sets are kept verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialEnv {
    pub bot_token: &'static str,
    pub channel_id: &'static str,
    /// Signing secret for webhooks, app-level token for socket mode.
    pub transport_secret: &'static str,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Socket => "socket",
        }
    }

    pub fn credential_env(&self) -> CredentialEnv {
        match self {
            Self::Webhook => CredentialEnv {
                bot_token: "SLAKC_POLICE_TOKEN",
                channel_id: "SLACK_POLICE_EMOJI_CHANNNEL_ID",
                transport_secret: "SLACK_POLICE_SIGNING_SECRET",
            },
            Self::Socket => CredentialEnv {
                bot_token: "SLACK_POLICE_BOT_TOKEN",
                channel_id: "SLACK_POLICE_EMOJI_CHANNEL_ID",
                transport_secret: "SLACK_POLICE_APP_TOKEN",
            },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub transport: Option<TransportMode>,
    pub bot_token: Option<String>,
    pub app_token: Option<String>,
    pub signing_secret: Option<String>,
    pub emoji_channel_id: Option<String>,
    pub api_base_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                transport: TransportMode::Webhook,
                bot_token: String::new().into(),
                app_token: None,
                signing_secret: None,
                emoji_channel_id: String::new(),
                api_base_url: SLACK_API_BASE.to_string(),
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 5002 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "webhook" | "http" => Ok(Self::Webhook),
            "socket" | "socket_mode" => Ok(Self::Socket),
            other => Err(ConfigError::Validation(format!(
                "unsupported slack transport `{other}` (expected webhook|socket)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("slack-police.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        // Credential variable names depend on the transport, so settle it first.
        if let Some(transport) = options.overrides.transport {
            config.slack.transport = transport;
        }
        config.apply_credential_env();
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn destination(&self) -> Destination {
        Destination::new(self.slack.emoji_channel_id.trim())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(transport) = slack.transport {
                self.slack.transport = transport;
            }
            if let Some(bot_token_value) = slack.bot_token {
                self.slack.bot_token = secret_value(bot_token_value);
            }
            if let Some(app_token_value) = slack.app_token {
                self.slack.app_token = Some(secret_value(app_token_value));
            }
            if let Some(signing_secret_value) = slack.signing_secret {
                self.slack.signing_secret = Some(secret_value(signing_secret_value));
            }
            if let Some(emoji_channel_id) = slack.emoji_channel_id {
                self.slack.emoji_channel_id = emoji_channel_id;
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SLACK_POLICE_TRANSPORT") {
            self.slack.transport = value.parse()?;
        }
        if let Some(value) = read_env("SLACK_POLICE_API_BASE_URL") {
            self.slack.api_base_url = value;
        }

        if let Some(value) = read_env("SLACK_POLICE_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SLACK_POLICE_PORT") {
            self.server.port = parse_u16("SLACK_POLICE_PORT", &value)?;
        }

        if let Some(value) = read_env("SLACK_POLICE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("SLACK_POLICE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_credential_env(&mut self) {
        let names = self.slack.transport.credential_env();

        if let Some(value) = read_env(names.bot_token) {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env(names.channel_id) {
            self.slack.emoji_channel_id = value;
        }
        if let Some(value) = read_env(names.transport_secret) {
            match self.slack.transport {
                TransportMode::Webhook => self.slack.signing_secret = Some(secret_value(value)),
                TransportMode::Socket => self.slack.app_token = Some(secret_value(value)),
            }
        }
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(transport) = overrides.transport {
            self.slack.transport = transport;
        }
        if let Some(bot_token) = overrides.bot_token {
            self.slack.bot_token = secret_value(bot_token);
        }
        if let Some(app_token) = overrides.app_token {
            self.slack.app_token = Some(secret_value(app_token));
        }
        if let Some(signing_secret) = overrides.signing_secret {
            self.slack.signing_secret = Some(secret_value(signing_secret));
        }
        if let Some(emoji_channel_id) = overrides.emoji_channel_id {
            self.slack.emoji_channel_id = emoji_channel_id;
        }
        if let Some(api_base_url) = overrides.api_base_url {
            self.slack.api_base_url = api_base_url;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("slack-police.toml"), PathBuf::from("config/slack-police.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let names = slack.transport.credential_env();

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "slack.bot_token is required (set `{}`). Get it from https://api.slack.com/apps > Your App > OAuth & Permissions",
            names.bot_token
        )));
    }
    if !bot_token.starts_with("xox") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must be an `xoxb-`/`xoxp-` token{hint}"
        )));
    }

    if slack.emoji_channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "slack.emoji_channel_id is required (set `{}`)",
            names.channel_id
        )));
    }

    match slack.transport {
        TransportMode::Webhook => {
            let missing = slack
                .signing_secret
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(format!(
                    "slack.signing_secret is required for the webhook transport (set `{}`). Get it from https://api.slack.com/apps > Your App > Basic Information",
                    names.transport_secret
                )));
            }
        }
        TransportMode::Socket => {
            let app_token = slack.app_token.as_ref().map(|value| value.expose_secret());
            let Some(app_token) = app_token.filter(|value| !value.trim().is_empty()) else {
                return Err(ConfigError::Validation(format!(
                    "slack.app_token is required for the socket transport (set `{}`). Get it from https://api.slack.com/apps > Your App > Basic Information > App-Level Tokens",
                    names.transport_secret
                )));
            };
            if !app_token.starts_with("xapp-") {
                let hint = if app_token.starts_with("xoxb-") {
                    " (hint: you may have used the bot token instead of the app token)"
                } else {
                    ""
                };
                return Err(ConfigError::Validation(format!(
                    "slack.app_token must start with `xapp-`{hint}"
                )));
            }
        }
    }

    let base_url = slack.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    transport: Option<TransportMode>,
    bot_token: Option<String>,
    app_token: Option<String>,
    signing_secret: Option<String>,
    emoji_channel_id: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
