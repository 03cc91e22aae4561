use env_logger::{Builder, WriteStyle};
use log::{LevelFilter, SetLoggerError};

use std::io::Write;

#[derive(Debug, Clone)]
pub struct ConsoleLoggerConfig {
    pub level: LevelFilter,
    pub colors: bool,
    pub include_module: bool,
    /// Extra `target=level` directives, same syntax as `RUST_LOG`.
    pub filters: Option<String>,
}

impl ConsoleLoggerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup("NEWENGINE_LOG")
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        let colors = lookup("NEWENGINE_LOG_COLORS")
            .map(|v| v != "0")
            .unwrap_or(true);
        let include_module = lookup("NEWENGINE_LOG_MODULE")
            .map(|v| v != "0")
            .unwrap_or(true);
        let filters = lookup("NEWENGINE_LOG_FILTER").filter(|v| !v.trim().is_empty());

        Self {
            level,
            colors,
            include_module,
            filters,
        }
    }

    #[inline]
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// `[LEVEL] target message` console output on top of `env_logger`.
pub struct ConsoleLogger {
    config: ConsoleLoggerConfig,
}

impl ConsoleLogger {
    #[inline]
    pub fn new(config: ConsoleLoggerConfig) -> Self {
        Self { config }
    }

    pub fn builder(&self) -> Builder {
        let mut builder = Builder::new();
        builder.filter_level(self.config.level);
        if let Some(filters) = &self.config.filters {
            builder.parse_filters(filters);
        }
        builder.write_style(if self.config.colors {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        });

        let include_module = self.config.include_module;
        builder.format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            if include_module {
                writeln!(
                    buf,
                    "[{style}{:<5}{style:#}] {:<25} {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(buf, "[{style}{:<5}{style:#}] {}", record.level(), record.args())
            }
        });
        builder
    }

    /// Installs the logger globally. Fails if another logger is already set.
    pub fn init(self) -> Result<(), SetLoggerError> {
        self.builder().try_init()
    }
}

#[inline]
pub fn init_console_logger(config: ConsoleLoggerConfig) -> Result<(), SetLoggerError> {
    ConsoleLogger::new(config).init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_values_are_parsed() {
        let vars: HashMap<&str, &str> = [
            ("NEWENGINE_LOG", "debug"),
            ("NEWENGINE_LOG_COLORS", "0"),
            ("NEWENGINE_LOG_FILTER", "content::resolve=trace"),
        ]
        .into_iter()
        .collect();
        let cfg = ConsoleLoggerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.level, LevelFilter::Debug);
        assert!(!cfg.colors);
        assert!(cfg.include_module);
        assert_eq!(cfg.filters.as_deref(), Some("content::resolve=trace"));
    }

    #[test]
    fn bad_level_falls_back_to_info() {
        let cfg = ConsoleLoggerConfig::from_lookup(|k| (k == "NEWENGINE_LOG").then(|| "loud".to_owned()));
        assert_eq!(cfg.level, LevelFilter::Info);
        assert!(cfg.filters.is_none());
    }
}
