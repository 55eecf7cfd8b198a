//! INI file configuration adapter.

use crate::domain::error::ScreenerError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScreenerError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| ScreenerError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ScreenerError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ScreenerError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[engine]
concurrency = 4
resolution = D

[data]
snapshots = /srv/screen/snapshots.json

[rules]
path = /srv/screen/rules.json
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "snapshots"),
            Some("/srv/screen/snapshots.json".to_string())
        );
        assert_eq!(adapter.get_string("engine", "resolution"), Some("D".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[engine]\nconcurrency = 8\n").unwrap();
        assert_eq!(adapter.get_string("engine", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[engine]\nconcurrency = 5\nhistory_candles = lots\n")
                .unwrap();
        assert_eq!(adapter.get_int("engine", "concurrency", 0), 5);
        assert_eq!(adapter.get_int("engine", "missing", 42), 42);
        assert_eq!(adapter.get_int("engine", "history_candles", 100), 100);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[engine]\nratio = 0.5\nbad = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("engine", "ratio", 0.0), 0.5);
        assert_eq!(adapter.get_double("engine", "bad", 9.9), 9.9);
        assert_eq!(adapter.get_double("engine", "missing", 9.9), 9.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[logging]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("logging", "a", false));
        assert!(adapter.get_bool("logging", "b", false));
        assert!(adapter.get_bool("logging", "c", false));
        assert!(!adapter.get_bool("logging", "d", true));
        assert!(!adapter.get_bool("logging", "e", true));
        assert!(!adapter.get_bool("logging", "f", true));
        assert!(adapter.get_bool("logging", "missing", true));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter =
            FileConfigAdapter::from_string("[data]\nsymbols = AAPL, MSFT,,KO \n").unwrap();
        assert_eq!(adapter.get_list("data", "symbols"), vec!["AAPL", "MSFT", "KO"]);
        assert!(adapter.get_list("data", "missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[logging]\nlevel = debug\nformat = json\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("logging", "level"), Some("debug".to_string()));
        assert_eq!(adapter.get_string("logging", "format"), Some("json".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(ScreenerError::ConfigParse { .. })));
    }
}
