use std::{
  env,
  net::SocketAddr,
  path::{Path, PathBuf},
  str::FromStr,
  time::Duration,
};

use chrono_tz::Tz;
use config::{ConfigError, Environment, File, Map};
use cron::Schedule;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};

use self::gpio::GpioConfig;
use crate::error::{GarageError, GarageResult};

pub mod gpio;

/// Optional TOML file (without extension) read from the working directory before the environment
pub const CONFIG_FILE: &str = "garage-config";

/// Optional `KEY=value` file read from the working directory. Anything already in the environment wins over it.
pub const DOTENV_FILE: &str = ".env";

/// The process environment `vars` laid over `dir/.env`, if there is one
fn environment(dir: &Path, vars: impl IntoIterator<Item = (String, String)>) -> GarageResult<Map<String, String>> {
  let mut environment = Map::new();
  match dotenvy::from_path_iter(dir.join(DOTENV_FILE)) {
    Ok(entries) => {
      for entry in entries {
        let (key, value) = entry?;
        environment.insert(key, value);
      }
    }
    Err(err) if err.not_found() => log::debug!("No {} in {}", DOTENV_FILE, dir.display()),
    Err(err) => return Err(err.into()),
  }
  environment.extend(vars);
  Ok(environment)
}

/// The configuration as written in the file/environment, before validation
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct RawConfig {
  #[serde_as(as = "DurationSeconds<u64>")]
  /// How long the door may travel before it is considered stuck
  pub stuck_door_seconds: Duration,

  /// Discord webhook notifications are posted to, if set
  #[serde(default)]
  pub discord_webhook_url: Option<String>,

  /// When to automatically open the door (cron syntax with seconds)
  #[serde(default)]
  pub auto_open_cron: Option<String>,

  /// When to automatically close the door (cron syntax with seconds)
  #[serde(default)]
  pub auto_close_cron: Option<String>,

  /// The timezone cron expressions are evaluated in, defaults to the system's local time
  #[serde(default)]
  pub cron_timezone: Option<Tz>,

  #[serde(default = "default_listen_address")]
  pub listen_address: SocketAddr,

  #[serde_as(as = "DurationMilliSeconds<u64>")]
  #[serde(default = "default_control_tick")]
  /// How often the control loop re-evaluates the door
  pub control_tick_ms: Duration,

  /// How many notifications may be waiting for delivery before new ones are dropped
  #[serde(default = "default_notification_queue")]
  pub notification_queue: usize,

  #[serde(default)]
  pub gpio: GpioConfig,
}

fn default_listen_address() -> SocketAddr {
  SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_control_tick() -> Duration {
  Duration::from_millis(10)
}

fn default_notification_queue() -> usize {
  16
}

impl RawConfig {
  pub fn load() -> GarageResult<Self> {
    Self::load_from(Path::new("."), env::vars())
  }

  /// Read `dir/garage-config.toml` (if present) overlaid with `dir/.env` (if present) and then `vars`.
  ///
  /// Nested keys use a double underscore, e.g. `GPIO__RAISE_PIN=26`.
  pub fn load_from(dir: &Path, vars: impl IntoIterator<Item = (String, String)>) -> GarageResult<Self> {
    let file = dir.join(CONFIG_FILE);
    Ok(
      config::Config::builder()
        .add_source(File::with_name(&file.to_string_lossy()).required(false))
        .add_source(
          Environment::default()
            .separator("__")
            .try_parsing(true)
            .source(Some(environment(dir, vars)?)),
        )
        .build()?
        .try_deserialize()?,
    )
  }
}

#[derive(Debug)]
pub struct Config {
  pub stuck_after: Duration,
  pub webhook_url: Option<String>,
  pub auto_open: Option<Schedule>,
  pub auto_close: Option<Schedule>,
  pub timezone: Option<Tz>,
  pub listen_address: SocketAddr,
  pub control_tick: Duration,
  pub notification_queue: usize,
  pub gpio: GpioConfig,
}

impl Config {
  pub fn load() -> GarageResult<Self> {
    RawConfig::load()?.try_into()
  }
}

/// Empty strings are how an unset variable usually arrives from a `.env` or systemd unit
fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|value| !value.trim().is_empty())
}

fn parse_cron(name: &'static str, expression: Option<String>) -> GarageResult<Option<Schedule>> {
  non_empty(expression)
    .map(|expression| {
      Schedule::from_str(expression.trim()).map_err(|source| GarageError::InvalidCron {
        name,
        expression,
        source,
      })
    })
    .transpose()
}

impl TryFrom<RawConfig> for Config {
  type Error = GarageError;

  fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
    if raw.control_tick_ms.is_zero() {
      return Err(ConfigError::Message("control_tick_ms must be greater than zero".to_string()).into());
    }
    if raw.notification_queue == 0 {
      return Err(ConfigError::Message("notification_queue must be greater than zero".to_string()).into());
    }

    Ok(Config {
      stuck_after: raw.stuck_door_seconds,
      webhook_url: non_empty(raw.discord_webhook_url),
      auto_open: parse_cron("auto_open_cron", raw.auto_open_cron)?,
      auto_close: parse_cron("auto_close_cron", raw.auto_close_cron)?,
      timezone: raw.cron_timezone,
      listen_address: raw.listen_address,
      control_tick: raw.control_tick_ms,
      notification_queue: raw.notification_queue,
      gpio: raw.gpio,
    })
  }
}

/// Configuration of the standalone temperature service, read from `TEMPERATURE_` prefixed variables so it can share
/// an environment with the door controller
#[derive(Debug, Deserialize)]
pub struct TemperatureConfig {
  #[serde(default = "default_temperature_listen_address")]
  pub listen_address: SocketAddr,

  /// Where the kernel's w1 driver exposes its devices
  #[serde(default = "default_w1_devices_dir")]
  pub w1_devices_dir: PathBuf,
}

fn default_temperature_listen_address() -> SocketAddr {
  SocketAddr::from(([0, 0, 0, 0], 8002))
}

fn default_w1_devices_dir() -> PathBuf {
  PathBuf::from("/sys/bus/w1/devices")
}

impl TemperatureConfig {
  pub fn load() -> GarageResult<Self> {
    Self::load_from(Path::new("."), env::vars())
  }

  /// Read `TEMPERATURE_LISTEN_ADDRESS` and `TEMPERATURE_W1_DEVICES_DIR` from `dir/.env` (if present) and `vars`
  pub fn load_from(dir: &Path, vars: impl IntoIterator<Item = (String, String)>) -> GarageResult<Self> {
    Ok(
      config::Config::builder()
        .add_source(
          Environment::with_prefix("TEMPERATURE")
            .try_parsing(true)
            .source(Some(environment(dir, vars)?)),
        )
        .build()?
        .try_deserialize()?,
    )
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use config::FileFormat;

  use super::*;

  fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
  }

  fn raw_from_toml(toml: &str) -> GarageResult<RawConfig> {
    Ok(
      config::Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize()?,
    )
  }

  fn from_toml(toml: &str) -> GarageResult<Config> {
    raw_from_toml(toml)?.try_into()
  }

  #[test]
  fn applies_defaults() {
    let config = from_toml("stuck_door_seconds = 30").unwrap();

    assert_eq!(config.stuck_after, Duration::from_secs(30));
    assert_eq!(config.control_tick, Duration::from_millis(10));
    assert_eq!(config.listen_address, "0.0.0.0:8080".parse().unwrap());
    assert_eq!(config.notification_queue, 16);
    assert_eq!(config.gpio, GpioConfig::default());
    assert!(config.webhook_url.is_none());
    assert!(config.auto_open.is_none());
    assert!(config.auto_close.is_none());
    assert!(config.timezone.is_none());
  }

  #[test]
  fn requires_stuck_threshold() {
    assert!(matches!(from_toml(""), Err(GarageError::Config(_))));
    assert!(matches!(from_toml("stuck_door_seconds = -4"), Err(GarageError::Config(_))));
    assert!(matches!(from_toml("stuck_door_seconds = \"soon\""), Err(GarageError::Config(_))));
  }

  #[test]
  fn empty_strings_are_unset() {
    let config = from_toml(
      r#"
        stuck_door_seconds = 30
        discord_webhook_url = ""
        auto_open_cron = ""
        auto_close_cron = "  "
      "#,
    )
    .unwrap();

    assert!(config.webhook_url.is_none());
    assert!(config.auto_open.is_none());
    assert!(config.auto_close.is_none());
  }

  #[test]
  fn parses_cron_and_timezone() {
    let config = from_toml(
      r#"
        stuck_door_seconds = 30
        auto_open_cron = "0 30 7 * * *"
        auto_close_cron = "0 0 21 * * Mon-Fri"
        cron_timezone = "Australia/Melbourne"
      "#,
    )
    .unwrap();

    assert!(config.auto_open.is_some());
    assert!(config.auto_close.is_some());
    assert_eq!(config.timezone, Some(chrono_tz::Australia::Melbourne));
  }

  #[test]
  fn rejects_invalid_cron() {
    let err = from_toml(
      r#"
        stuck_door_seconds = 30
        auto_close_cron = "every evening"
      "#,
    )
    .unwrap_err();

    assert!(matches!(err, GarageError::InvalidCron { name: "auto_close_cron", .. }));
  }

  #[test]
  fn rejects_zero_tick() {
    assert!(from_toml("stuck_door_seconds = 30\ncontrol_tick_ms = 0").is_err());
  }

  #[test]
  fn reads_gpio_overrides() {
    let config = from_toml(
      r#"
        stuck_door_seconds = 30

        [gpio]
        raise_pin = 20
        open_sensor_pin = 21
      "#,
    )
    .unwrap();

    assert_eq!(config.gpio.raise_pin.bcm_number(), 20);
    assert_eq!(config.gpio.open_sensor_pin.bcm_number(), 21);
    assert_eq!(config.gpio.lower_pin, GpioConfig::default().lower_pin);

    assert!(from_toml("stuck_door_seconds = 30\n[gpio]\nraise_pin = 40").is_err());
  }

  #[test]
  fn reads_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config: Config = RawConfig::load_from(
      dir.path(),
      vars(&[
        ("STUCK_DOOR_SECONDS", "30"),
        ("GPIO__RAISE_PIN", "20"),
        ("AUTO_OPEN_CRON", "0 30 7 * * Mon-Fri"),
        ("DISCORD_WEBHOOK_URL", ""),
        ("LISTEN_ADDRESS", "127.0.0.1:9000"),
      ]),
    )
    .unwrap()
    .try_into()
    .unwrap();

    assert_eq!(config.stuck_after, Duration::from_secs(30));
    assert_eq!(config.gpio.raise_pin.bcm_number(), 20);
    assert_eq!(config.gpio.lower_pin, GpioConfig::default().lower_pin);
    assert!(config.auto_open.is_some());
    assert!(config.webhook_url.is_none());
    assert_eq!(config.listen_address, "127.0.0.1:9000".parse().unwrap());
  }

  #[test]
  fn non_numeric_threshold_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
      RawConfig::load_from(dir.path(), vars(&[("STUCK_DOOR_SECONDS", "abc")])),
      Err(GarageError::Config(_))
    ));
    assert!(matches!(
      RawConfig::load_from(dir.path(), vars(&[])),
      Err(GarageError::Config(_))
    ));
  }

  #[test]
  fn environment_wins_over_dotenv() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
      dir.path().join(DOTENV_FILE),
      "STUCK_DOOR_SECONDS=45\nCRON_TIMEZONE=Australia/Melbourne\n",
    )
    .unwrap();

    let from_dotenv: Config = RawConfig::load_from(dir.path(), vars(&[])).unwrap().try_into().unwrap();
    assert_eq!(from_dotenv.stuck_after, Duration::from_secs(45));
    assert_eq!(from_dotenv.timezone, Some(chrono_tz::Australia::Melbourne));

    let overridden: Config = RawConfig::load_from(dir.path(), vars(&[("STUCK_DOOR_SECONDS", "30")]))
      .unwrap()
      .try_into()
      .unwrap();
    assert_eq!(overridden.stuck_after, Duration::from_secs(30));
  }

  #[test]
  fn dotenv_wins_over_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
      dir.path().join(format!("{CONFIG_FILE}.toml")),
      "stuck_door_seconds = 30\ncontrol_tick_ms = 50\n",
    )
    .unwrap();
    fs::write(dir.path().join(DOTENV_FILE), "CONTROL_TICK_MS=20\n").unwrap();

    let config: Config = RawConfig::load_from(dir.path(), vars(&[])).unwrap().try_into().unwrap();
    assert_eq!(config.stuck_after, Duration::from_secs(30));
    assert_eq!(config.control_tick, Duration::from_millis(20));
  }

  #[test]
  fn temperature_service_has_its_own_keys() {
    let dir = tempfile::tempdir().unwrap();

    let defaults = TemperatureConfig::load_from(dir.path(), vars(&[("LISTEN_ADDRESS", "0.0.0.0:8080")])).unwrap();
    assert_eq!(defaults.listen_address, "0.0.0.0:8002".parse().unwrap());
    assert_eq!(defaults.w1_devices_dir, PathBuf::from("/sys/bus/w1/devices"));

    let config = TemperatureConfig::load_from(
      dir.path(),
      vars(&[
        ("LISTEN_ADDRESS", "0.0.0.0:8080"),
        ("TEMPERATURE_LISTEN_ADDRESS", "127.0.0.1:9002"),
        ("TEMPERATURE_W1_DEVICES_DIR", "/tmp/w1"),
      ]),
    )
    .unwrap();
    assert_eq!(config.listen_address, "127.0.0.1:9002".parse().unwrap());
    assert_eq!(config.w1_devices_dir, PathBuf::from("/tmp/w1"));
  }
}
