//! Settings file for the `monitor` command.

use serde::Deserialize;

use benchsight_common::LoggingConfig;
use benchsight_monitor::MonitorSettings;

/// Top-level settings file (JSON5).
///
/// ```json5
/// {
///     logging: { level: "info", format: "text" },
///     monitor: {
///         launcher: "/opt/benchsight/resource_monitor.sh",
///         pid_folder: "/dev/shm/monitor",
///         frequency: 0.1,
///         fields: "time:str:1,cpu:float:5,gpus:float:8:",
///     },
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,

    pub monitor: MonitorSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchsight_common::{LogFormat, parse_config};

    #[test]
    fn test_parse_settings() {
        let json5 = r#"
        {
            logging: { level: "debug", format: "json" },
            monitor: {
                launcher: "/opt/benchsight/resource_monitor.sh",
                frequency: 0.5,
                fields: "time:str:1,cpu:float:5",
            },
        }
        "#;

        let settings: Settings = parse_config(json5).unwrap();

        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.monitor.frequency, 0.5);
        assert_eq!(settings.monitor.fields.fields().len(), 2);
    }

    #[test]
    fn test_monitor_section_required() {
        assert!(parse_config::<Settings>("{}").is_err());
    }
}
