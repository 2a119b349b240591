use crate::domain::reminder::DEFAULT_LEAD_TIME_MINUTES;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    pub lead_time_minutes: i64,
    pub poll_interval: Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            lead_time_minutes: DEFAULT_LEAD_TIME_MINUTES,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS),
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([(
        APP_JSON,
        serde_json::json!({
            "schema": 1,
            "appName": "LifeOS",
            "timezone": "UTC",
            "reminders": {
                "leadTimeMinutes": DEFAULT_LEAD_TIME_MINUTES,
                "pollIntervalSeconds": DEFAULT_POLL_INTERVAL_SECONDS
            }
        }),
    )])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<serde_json::Value, InfraError> {
    read_config(&config_dir.join(APP_JSON))
}

pub fn read_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    let app = load_app_config(config_dir)?;
    let Some(name) = app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Ok(Tz::UTC);
    };
    name.parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{name}': {error}")))
}

pub fn read_reminder_settings(config_dir: &Path) -> Result<ReminderSettings, InfraError> {
    let app = load_app_config(config_dir)?;
    let defaults = ReminderSettings::default();
    let Some(reminders) = app.get("reminders") else {
        return Ok(defaults);
    };

    let lead_time_minutes = match reminders.get("leadTimeMinutes") {
        None | Some(serde_json::Value::Null) => defaults.lead_time_minutes,
        Some(value) => value
            .as_i64()
            .filter(|minutes| *minutes >= 0)
            .ok_or_else(|| {
                InfraError::InvalidConfig(
                    "reminders.leadTimeMinutes must be a non-negative integer".to_string(),
                )
            })?,
    };
    let poll_interval = match reminders.get("pollIntervalSeconds") {
        None | Some(serde_json::Value::Null) => defaults.poll_interval,
        Some(value) => value
            .as_u64()
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                InfraError::InvalidConfig(
                    "reminders.pollIntervalSeconds must be a positive integer".to_string(),
                )
            })?,
    };

    Ok(ReminderSettings {
        lead_time_minutes,
        poll_interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_app_json(config_dir: &Path, value: serde_json::Value) {
        fs::write(config_dir.join(APP_JSON), value.to_string()).expect("write app.json");
    }

    #[test]
    fn defaults_are_written_once_and_readable() {
        let dir = tempfile::tempdir().expect("temp dir");
        ensure_default_configs(dir.path()).expect("write defaults");

        assert_eq!(read_timezone(dir.path()).expect("timezone"), Tz::UTC);
        assert_eq!(
            read_reminder_settings(dir.path()).expect("reminder settings"),
            ReminderSettings::default()
        );

        write_app_json(dir.path(), serde_json::json!({"schema": 1, "timezone": "Asia/Tokyo"}));
        ensure_default_configs(dir.path()).expect("defaults keep existing file");
        assert_eq!(
            read_timezone(dir.path()).expect("timezone"),
            chrono_tz::Asia::Tokyo
        );
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_app_json(dir.path(), serde_json::json!({"schema": 2}));
        match load_app_config(dir.path()) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("unsupported schema")),
            other => panic!("expected invalid config error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_app_json(dir.path(), serde_json::json!({"schema": 1, "timezone": "Mars/Olympus"}));
        assert!(matches!(
            read_timezone(dir.path()),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reminder_settings_read_overrides_and_reject_zero_interval() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_app_json(
            dir.path(),
            serde_json::json!({
                "schema": 1,
                "reminders": { "leadTimeMinutes": 10, "pollIntervalSeconds": 30 }
            }),
        );
        let settings = read_reminder_settings(dir.path()).expect("settings");
        assert_eq!(settings.lead_time_minutes, 10);
        assert_eq!(settings.poll_interval, Duration::from_secs(30));

        write_app_json(
            dir.path(),
            serde_json::json!({"schema": 1, "reminders": { "pollIntervalSeconds": 0 }}),
        );
        assert!(read_reminder_settings(dir.path()).is_err());
    }
}
