//! Runtime configuration
//!
//! Loaded from environment variables (a `.env` file is honoured by the binary)
//! with defaults matching the vendor's public store, then overridden by
//! command-line flags and validated once at startup.

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Vendor API endpoints and request behaviour.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Inventory endpoint, polled every tick.
    pub inventory_url: String,
    /// Product search endpoint, used for the SKU/name listing.
    pub search_url: String,
    /// Store page used when a row carries no product URL.
    pub store_url: String,
    /// Sent as `Origin` and `Referer`.
    pub origin: String,
    pub manufacturer: String,
    pub listing_limit: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SoundConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub webhook_url: String,
    pub username: String,
    /// `<@user_id>` or `<@&role_id>`, only used for in-stock alerts.
    pub mention: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct NtfyConfig {
    pub enabled: bool,
    pub server_url: String,
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Takes precedence over username/password.
    pub access_token: Option<String>,
    pub priority: String,
}

#[derive(Debug, Clone)]
pub struct HomeAssistantConfig {
    pub enabled: bool,
    pub url: String,
    pub token: String,
    pub notification_service: String,
    pub critical_alerts: bool,
    /// Clamped to 0.0..=1.0
    pub critical_volume: f64,
}

/// One typed section per sink.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub console: ConsoleConfig,
    pub sound: SoundConfig,
    pub browser: BrowserConfig,
    pub discord: DiscordConfig,
    pub telegram: TelegramConfig,
    pub ntfy: NtfyConfig,
    pub home_assistant: HomeAssistantConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub locale: String,
    pub country: String,
    pub currency: String,
    /// Product names to watch, in priority order.
    pub products: Vec<String>,
    pub products_file: PathBuf,
    pub check_interval: Duration,
    pub cooldown: Duration,
    pub sku_refresh_interval: Duration,
    pub status_enabled: bool,
    pub status_interval: Duration,
    pub dispatch_timeout: Duration,
    pub api: ApiConfig,
    pub sinks: SinkConfig,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SKUWATCH_LOCALE` (default: en-gb)
    /// - `SKUWATCH_COUNTRY` (default: United Kingdom)
    /// - `SKUWATCH_CURRENCY` (default: £)
    /// - `SKUWATCH_PRODUCTS` comma-separated product names
    /// - `SKUWATCH_PRODUCTS_FILE` (default: skuwatch_products.json)
    /// - `SKUWATCH_CHECK_INTERVAL_SECS` (default: 10)
    /// - `SKUWATCH_COOLDOWN_SECS` (default: 120)
    /// - `SKUWATCH_SKU_REFRESH_SECS` (default: 3600)
    /// - `SKUWATCH_STATUS_ENABLED` (default: true)
    /// - `SKUWATCH_STATUS_INTERVAL_SECS` (default: 3600)
    /// - `SKUWATCH_DISPATCH_TIMEOUT_SECS` (default: 15)
    /// - `SKUWATCH_REQUEST_TIMEOUT_SECS` (default: 10)
    /// - `SKUWATCH_INVENTORY_URL`, `SKUWATCH_SEARCH_URL`, `SKUWATCH_STORE_URL`,
    ///   `SKUWATCH_ORIGIN`, `SKUWATCH_MANUFACTURER`
    /// - per sink: `CONSOLE_*`, `SOUND_*`, `BROWSER_*`, `DISCORD_*`,
    ///   `TELEGRAM_*`, `NTFY_*`, `HOMEASSISTANT_*`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let locale = vars.string("SKUWATCH_LOCALE", "en-gb");

        let store_url = vars.string(
            "SKUWATCH_STORE_URL",
            &format!(
                "https://marketplace.nvidia.com/{locale}/consumer/graphics-cards/?locale={locale}&page=1&limit=12&category=GPU&manufacturer=NVIDIA"
            ),
        );

        Self {
            country: vars.string("SKUWATCH_COUNTRY", "United Kingdom"),
            currency: vars.string("SKUWATCH_CURRENCY", "£"),
            products: vars.list("SKUWATCH_PRODUCTS"),
            products_file: PathBuf::from(vars.string("SKUWATCH_PRODUCTS_FILE", "skuwatch_products.json")),
            check_interval: vars.secs("SKUWATCH_CHECK_INTERVAL_SECS", 10),
            cooldown: vars.secs("SKUWATCH_COOLDOWN_SECS", 120),
            sku_refresh_interval: vars.secs("SKUWATCH_SKU_REFRESH_SECS", 3600),
            status_enabled: vars.flag("SKUWATCH_STATUS_ENABLED", true),
            status_interval: vars.secs("SKUWATCH_STATUS_INTERVAL_SECS", 3600),
            dispatch_timeout: vars.secs("SKUWATCH_DISPATCH_TIMEOUT_SECS", 15),
            api: ApiConfig {
                inventory_url: vars.string(
                    "SKUWATCH_INVENTORY_URL",
                    "https://api.store.nvidia.com/partner/v1/feinventory",
                ),
                search_url: vars.string(
                    "SKUWATCH_SEARCH_URL",
                    "https://api.nvidia.partners/edge/product/search",
                ),
                store_url,
                origin: vars.string("SKUWATCH_ORIGIN", "https://marketplace.nvidia.com"),
                manufacturer: vars.string("SKUWATCH_MANUFACTURER", "NVIDIA"),
                listing_limit: vars.parse("SKUWATCH_LISTING_LIMIT", 100),
                request_timeout: vars.secs("SKUWATCH_REQUEST_TIMEOUT_SECS", 10),
            },
            sinks: SinkConfig {
                console: ConsoleConfig {
                    enabled: vars.flag("CONSOLE_ENABLED", true),
                },
                sound: SoundConfig {
                    enabled: vars.flag("SOUND_ENABLED", true),
                },
                browser: BrowserConfig {
                    enabled: vars.flag("BROWSER_ENABLED", true),
                },
                discord: DiscordConfig {
                    enabled: vars.flag("DISCORD_ENABLED", false),
                    webhook_url: vars.string("DISCORD_WEBHOOK_URL", ""),
                    username: vars.string("DISCORD_USERNAME", "Stock Checker"),
                    mention: vars.optional("DISCORD_MENTION"),
                    avatar_url: vars.optional("DISCORD_AVATAR_URL"),
                },
                telegram: TelegramConfig {
                    enabled: vars.flag("TELEGRAM_ENABLED", false),
                    bot_token: vars.string("TELEGRAM_BOT_TOKEN", ""),
                    chat_id: vars.string("TELEGRAM_CHAT_ID", ""),
                    api_url: vars.string("TELEGRAM_API_URL", "https://api.telegram.org"),
                },
                ntfy: NtfyConfig {
                    enabled: vars.flag("NTFY_ENABLED", false),
                    server_url: vars.string("NTFY_SERVER_URL", "https://ntfy.sh"),
                    topic: vars.string("NTFY_TOPIC", ""),
                    username: vars.optional("NTFY_USERNAME"),
                    password: vars.optional("NTFY_PASSWORD"),
                    access_token: vars.optional("NTFY_ACCESS_TOKEN"),
                    priority: vars.string("NTFY_PRIORITY", "default"),
                },
                home_assistant: HomeAssistantConfig {
                    enabled: vars.flag("HOMEASSISTANT_ENABLED", false),
                    url: vars.string("HOMEASSISTANT_URL", "http://homeassistant.local:8123"),
                    token: vars.string("HOMEASSISTANT_TOKEN", ""),
                    notification_service: vars.string(
                        "HOMEASSISTANT_NOTIFICATION_SERVICE",
                        "mobile_app_phone",
                    ),
                    critical_alerts: vars.flag("HOMEASSISTANT_CRITICAL_ALERTS", true),
                    critical_volume: vars
                        .parse::<f64>("HOMEASSISTANT_CRITICAL_VOLUME", 1.0)
                        .clamp(0.0, 1.0),
                },
            },
            locale,
        }
    }

    /// Apply command-line overrides.
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(secs) = args.check_interval {
            self.check_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = args.cooldown {
            self.cooldown = Duration::from_secs(secs);
        }
        if let Some(secs) = args.sku_refresh_interval {
            self.sku_refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = args.status_interval {
            self.status_interval = Duration::from_secs(secs);
        }
        if args.no_browser {
            self.sinks.browser.enabled = false;
        }
        if args.no_sound {
            self.sinks.sound.enabled = false;
        }
        if args.no_console {
            self.sinks.console.enabled = false;
        }
    }

    /// Startup validation. Enabled sinks must be fully configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.products.is_empty() {
            return Err(ConfigError::MissingVariable(
                "SKUWATCH_PRODUCTS (no products configured for monitoring)".to_string(),
            ));
        }

        for (name, value) in [
            ("check interval", self.check_interval),
            ("SKU refresh interval", self.sku_refresh_interval),
            ("status interval", self.status_interval),
            ("dispatch timeout", self.dispatch_timeout),
            ("request timeout", self.api.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be greater than zero")));
            }
        }

        require_http("SKUWATCH_INVENTORY_URL", &self.api.inventory_url)?;
        require_http("SKUWATCH_SEARCH_URL", &self.api.search_url)?;
        require_http("SKUWATCH_STORE_URL", &self.api.store_url)?;

        let discord = &self.sinks.discord;
        if discord.enabled {
            require_http("DISCORD_WEBHOOK_URL", &discord.webhook_url)?;
        }

        let telegram = &self.sinks.telegram;
        if telegram.enabled {
            require_set("TELEGRAM_BOT_TOKEN", &telegram.bot_token)?;
            require_set("TELEGRAM_CHAT_ID", &telegram.chat_id)?;
        }

        let ntfy = &self.sinks.ntfy;
        if ntfy.enabled {
            require_http("NTFY_SERVER_URL", &ntfy.server_url)?;
            require_set("NTFY_TOPIC", &ntfy.topic)?;
            if !matches!(
                ntfy.priority.as_str(),
                "min" | "low" | "default" | "high" | "max" | "urgent"
            ) {
                return Err(ConfigError::InvalidValue(format!(
                    "NTFY_PRIORITY must be one of min/low/default/high/max/urgent, got '{}'",
                    ntfy.priority
                )));
            }
        }

        let ha = &self.sinks.home_assistant;
        if ha.enabled {
            require_http("HOMEASSISTANT_URL", &ha.url)?;
            require_set("HOMEASSISTANT_TOKEN", &ha.token)?;
            require_set("HOMEASSISTANT_NOTIFICATION_SERVICE", &ha.notification_service)?;
        }

        Ok(())
    }
}

fn require_set(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingVariable(name.to_string()));
    }
    Ok(())
}

fn require_http(name: &str, value: &str) -> Result<(), ConfigError> {
    require_set(name, value)?;
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must start with http:// or https://"
        )));
    }
    Ok(())
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        match self.optional(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Invalid {} '{}', using default", key, raw);
                default
            }),
            None => default,
        }
    }

    fn secs(&self, key: &str, default: u64) -> Duration {
        Duration::from_secs(self.parse(key, default))
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.optional(key).map(|s| s.to_lowercase()) {
            Some(s) if matches!(s.as_str(), "1" | "true" | "yes" | "on") => true,
            Some(s) if matches!(s.as_str(), "0" | "false" | "no" | "off") => false,
            _ => default,
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.optional(key)
            .map(|s| {
                s.split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub test: bool,
    pub list_products: bool,
    pub help: bool,
    pub check_interval: Option<u64>,
    pub cooldown: Option<u64>,
    pub sku_refresh_interval: Option<u64>,
    pub status_interval: Option<u64>,
    pub no_browser: bool,
    pub no_sound: bool,
    pub no_console: bool,
}

pub const USAGE: &str = "\
Usage: skuwatch [OPTIONS]

Options:
  --test                        Send a test alert through every sink and exit
  --list-products               List the vendor's products for the locale and exit
  --interval <SECS>             Seconds between stock checks
  --cooldown <SECS>             Seconds before the same product may alert again
  --sku-refresh-interval <SECS> Seconds between product listing refreshes
  --status-interval <SECS>      Seconds between status summaries
  --no-browser                  Do not open the product page on restock
  --no-sound                    Do not play a sound on restock
  --no-console                  Do not print alerts to the console
  -h, --help                    Print this help";

impl CliArgs {
    /// Parse flags, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };

            match flag.as_str() {
                "--test" => parsed.test = true,
                "--list-products" | "--list-cards" => parsed.list_products = true,
                "-h" | "--help" => parsed.help = true,
                "--no-browser" => parsed.no_browser = true,
                "--no-sound" => parsed.no_sound = true,
                "--no-console" => parsed.no_console = true,
                "--interval" | "--check-interval" => {
                    parsed.check_interval = Some(seconds(&flag, inline, &mut args)?)
                }
                "--cooldown" => parsed.cooldown = Some(seconds(&flag, inline, &mut args)?),
                "--sku-refresh-interval" | "--sku-check-interval" => {
                    parsed.sku_refresh_interval = Some(seconds(&flag, inline, &mut args)?)
                }
                "--status-interval" => {
                    parsed.status_interval = Some(seconds(&flag, inline, &mut args)?)
                }
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(parsed)
    }
}

fn seconds<I>(flag: &str, inline: Option<String>, rest: &mut I) -> Result<u64, ConfigError>
where
    I: Iterator<Item = String>,
{
    let raw = inline
        .or_else(|| rest.next())
        .ok_or_else(|| ConfigError::InvalidValue(format!("{flag} requires a value in seconds")))?;

    raw.parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(format!("{flag} expects whole seconds, got '{raw}'")))
}
