use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default admin RPC listener port.
pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Minimum / maximum routine interval, minutes (spec §3 invariant).
pub const MIN_INTERVAL_MINUTES: u32 = 5;
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

/// Default per-routine consecutive-skip warning threshold (spec §3).
pub const DEFAULT_MAX_CONSECUTIVE_SKIPS: u32 = 5;
/// Default per-agent concurrent pulse-session cap (spec §4.2).
pub const DEFAULT_MAX_CONCURRENT_PULSE_SESSIONS: u32 = 2;

/// Top-level config (pulsegate.toml + PULSEGATE_* env overrides), following
/// the `figment` load pattern from `skynet-core::config::SkynetConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulsegateConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub wake: WakeConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

impl Default for PulsegateConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            wake: WakeConfig::default(),
            channels: ChannelsConfig::default(),
        }
    }
}

impl PulsegateConfig {
    /// Load config from a TOML file with `PULSEGATE_*` env var overrides.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PULSEGATE_").split("_"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.pulsegate/pulsegate.toml")
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.pulsegate/pulsegate.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Scheduler-wide defaults; individual routines can override some of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_max_consecutive_skips")]
    pub max_consecutive_skips: u32,
    #[serde(default = "default_max_concurrent_pulse_sessions")]
    pub max_concurrent_pulse_sessions: u32,
    /// Width of the conflict-detection window, minutes (spec §4.1).
    #[serde(default = "default_conflict_window_minutes")]
    pub conflict_window_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_skips: default_max_consecutive_skips(),
            max_concurrent_pulse_sessions: default_max_concurrent_pulse_sessions(),
            conflict_window_minutes: default_conflict_window_minutes(),
        }
    }
}

/// Wake subsystem guardrail defaults (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeConfig {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_seconds: u64,
    #[serde(default = "default_max_wakes_per_day")]
    pub max_wakes_per_day: u32,
    #[serde(default = "default_max_wakes_per_pair_per_day")]
    pub max_wakes_per_pair_per_day: u32,
    /// TTL applied to day-bucket counters, hours (spec §3: 48h to tolerate
    /// timezone edges).
    #[serde(default = "default_counter_ttl_hours")]
    pub counter_ttl_hours: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_secs(),
            max_wakes_per_day: default_max_wakes_per_day(),
            max_wakes_per_pair_per_day: default_max_wakes_per_pair_per_day(),
            counter_ttl_hours: default_counter_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    pub telegram: Option<TelegramConfig>,
    pub discord: Option<DiscordConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
    pub signal: Option<SignalConfig>,
    /// Minutes a sticky `(channel, sender) -> agent` binding lasts since the
    /// last exchange (spec §3 `Routing sticky entry`).
    #[serde(default = "default_sticky_ttl_minutes")]
    pub sticky_ttl_minutes: u64,
    /// When true, the allowlist is bypassed for every channel (spec §3
    /// `Allowlist entry`).
    #[serde(default)]
    pub allow_all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default)]
    pub default_agent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    #[serde(default)]
    pub default_agent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub access_token: String,
    pub phone_number_id: String,
    #[serde(default = "default_whatsapp_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub default_agent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Base URL of a signal-cli JSON-RPC/REST bridge.
    pub base_url: String,
    /// The bot's own registered E.164 number.
    pub account: String,
    #[serde(default)]
    pub default_agent_id: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_max_consecutive_skips() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_SKIPS
}
fn default_max_concurrent_pulse_sessions() -> u32 {
    DEFAULT_MAX_CONCURRENT_PULSE_SESSIONS
}
fn default_conflict_window_minutes() -> u32 {
    1
}
fn default_cooldown_secs() -> u64 {
    60
}
fn default_max_wakes_per_day() -> u32 {
    20
}
fn default_max_wakes_per_pair_per_day() -> u32 {
    5
}
fn default_counter_ttl_hours() -> u64 {
    48
}
fn default_sticky_ttl_minutes() -> u64 {
    30
}
fn default_whatsapp_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}
