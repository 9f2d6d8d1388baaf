use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::RelayError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Chat-completion provider base URL
    #[arg(long, env = "PROVIDER_API_URL", global = true)]
    pub provider_api_url: Option<String>,

    /// Chat-completion provider API key
    #[arg(long, env = "PROVIDER_API_KEY", hide_env_values = true, global = true)]
    pub provider_api_key: Option<String>,

    /// Chat-completion model identifier
    #[arg(long, env = "PROVIDER_MODEL", global = true)]
    pub provider_model: Option<String>,

    /// Public URL of this application, sent as `HTTP-Referer`
    #[arg(long, env = "APP_URL", global = true)]
    pub app_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP relay (default)
    Serve,
    /// Stream one reply from a running relay to stdout
    Ask {
        /// Message to send
        message: String,
        /// Relay base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        relay_url: String,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub app: AppIdentity,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Provider settings as loaded. Each of the three required values may be
/// absent; [`ProviderConfig::resolve`] turns that into a per-request error.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: u32,
}

/// How this application identifies itself to the provider.
#[derive(Debug, Deserialize, Clone)]
pub struct AppIdentity {
    pub url: String,
    pub title: String,
}

/// Parameters for the non-streaming chat endpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub temperature: f32,
}

/// Fully resolved provider settings, ready for an upstream call.
#[derive(Clone)]
pub struct ProviderSettings {
    /// Base URL without trailing slash.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// One of the provider values every upstream call needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Required {
    Key,
    Model,
    Url,
}

impl Required {
    fn missing(self) -> RelayError {
        let reason = match self {
            Self::Key => "Provider API key not configured",
            Self::Model => "Provider model not configured",
            Self::Url => "Provider API URL not configured",
        };
        RelayError::Configuration(reason.to_string())
    }
}

impl ProviderConfig {
    /// Validate the provider settings for the streaming relay.
    ///
    /// Checks run in a fixed order (key, model, URL) so the first missing
    /// value is the one reported.
    pub fn resolve(&self) -> Result<ProviderSettings, RelayError> {
        self.resolve_in([Required::Key, Required::Model, Required::Url])
    }

    /// Validate the provider settings for the non-streaming chat endpoints.
    ///
    /// Same checks as [`ProviderConfig::resolve`], in the order key, URL,
    /// model.
    pub fn resolve_for_chat(&self) -> Result<ProviderSettings, RelayError> {
        self.resolve_in([Required::Key, Required::Url, Required::Model])
    }

    fn value(&self, field: Required) -> Option<&str> {
        match field {
            Required::Key => non_empty(self.api_key.as_ref()),
            Required::Model => non_empty(self.model.as_ref()),
            Required::Url => non_empty(self.api_url.as_ref()),
        }
    }

    fn resolve_in(&self, order: [Required; 3]) -> Result<ProviderSettings, RelayError> {
        let value = |field: Required| self.value(field).ok_or_else(|| field.missing());
        for field in order {
            value(field)?;
        }

        let api_key = value(Required::Key)?;
        let model = value(Required::Model)?;
        let api_url = value(Required::Url)?;

        url::Url::parse(api_url).map_err(|e| {
            RelayError::Configuration(format!("Provider API URL is invalid: {e}"))
        })?;

        Ok(ProviderSettings {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: self.max_tokens,
        })
    }
}

impl ProviderSettings {
    /// Chat completions endpoint for this provider.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_url)
    }
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Build the layered configuration.
    ///
    /// Priority: CLI flag > CLI env var > `RELAY_` env > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("provider.max_tokens", 1000)?
            .set_default("app.url", "http://localhost:3000")?
            .set_default("app.title", "aikadabra")?
            .set_default(
                "chat.system_prompt",
                "You are aikadabra, a direct and honest AI assistant. \
                 Keep responses concise and to the point.",
            )?
            .set_default("chat.temperature", 0.7)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. RELAY_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = &cli.provider_api_url {
            builder = builder.set_override("provider.api_url", url.as_str())?;
        }
        if let Some(key) = &cli.provider_api_key {
            builder = builder.set_override("provider.api_key", key.as_str())?;
        }
        if let Some(model) = &cli.provider_model {
            builder = builder.set_override("provider.model", model.as_str())?;
        }
        if let Some(url) = &cli.app_url {
            builder = builder.set_override("app.url", url.as_str())?;
        }

        builder.build()?.try_deserialize()
    }
}
