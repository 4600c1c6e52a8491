use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

const DATA_DIR_NAME: &str = ".scheduled";
const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_TASKS_FILE: &str = "tasks.json";
const DEFAULT_AUTOSAVE_SECONDS: u64 = 15;

#[derive(Debug)]
pub enum ConfigError {
	Io(std::io::Error),
	TomlDecode(PathBuf, toml::de::Error),
}

impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ConfigError::Io(err) => write!(f, "io error: {err}"),
			ConfigError::TomlDecode(path, err) => {
				write!(f, "failed to parse {}: {err}", path.display())
			}
		}
	}
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub tasks_file: String,
	pub autosave_seconds: u64,
	pub log_level: Option<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			tasks_file: DEFAULT_TASKS_FILE.to_string(),
			autosave_seconds: DEFAULT_AUTOSAVE_SECONDS,
			log_level: None,
		}
	}
}

impl Settings {
	pub fn autosave_interval(&self) -> Duration {
		Duration::from_secs(self.autosave_seconds.max(1))
	}
}

/// Reads `config.toml` from the data dir; a tasks file given on the command
/// line wins over the one in the file.
pub fn load_settings(data_dir: &Path, cli_tasks_file: Option<String>) -> Result<Settings, ConfigError> {
	let path = data_dir.join(CONFIG_FILE);
	let mut settings = match fs::read_to_string(&path) {
		Ok(raw) => toml::from_str(&raw).map_err(|err| ConfigError::TomlDecode(path.clone(), err))?,
		Err(err) if err.kind() == ErrorKind::NotFound => Settings::default(),
		Err(err) => return Err(ConfigError::Io(err)),
	};

	if let Some(tasks_file) = cli_tasks_file {
		settings.tasks_file = tasks_file;
	}
	if settings.tasks_file.trim().is_empty() {
		settings.tasks_file = DEFAULT_TASKS_FILE.to_string();
	}

	Ok(settings)
}

pub fn resolve_data_dir(cli_dir: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_dir {
		return absolutize(path);
	}

	if let Some(path) = env::var_os("WEEKBOARD_HOME") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return absolutize(path);
		}
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(DATA_DIR_NAME);
	}

	PathBuf::from(DATA_DIR_NAME)
}

pub fn ensure_data_dir(data_dir: &Path) -> Result<(), ConfigError> {
	fs::create_dir_all(data_dir).map_err(ConfigError::Io)
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}

#[cfg(test)]
mod tests {
	use std::fs;
	use std::path::PathBuf;
	use std::time::Duration;

	use super::{ConfigError, Settings, load_settings, resolve_data_dir};

	#[test]
	fn missing_config_uses_defaults() {
		let dir = temp_dir("weekboard_config_missing");
		let settings = load_settings(&dir, None).expect("defaults should load");
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.autosave_interval(), Duration::from_secs(15));
	}

	#[test]
	fn reads_partial_config_and_cli_override() {
		let dir = temp_dir("weekboard_config_partial");
		fs::create_dir_all(&dir).expect("temp dir");
		fs::write(dir.join("config.toml"), "tasks_file = \"work.json\"\nautosave_seconds = 0\n")
			.expect("write config");

		let settings = load_settings(&dir, None).expect("config should load");
		assert_eq!(settings.tasks_file, "work.json");
		assert_eq!(settings.autosave_interval(), Duration::from_secs(1));
		assert_eq!(settings.log_level, None);

		let settings = load_settings(&dir, Some("home.json".to_string())).expect("config should load");
		assert_eq!(settings.tasks_file, "home.json");
		let _ = fs::remove_dir_all(dir);
	}

	#[test]
	fn malformed_config_is_an_error() {
		let dir = temp_dir("weekboard_config_malformed");
		fs::create_dir_all(&dir).expect("temp dir");
		fs::write(dir.join("config.toml"), "autosave_seconds = \"soon\"").expect("write config");

		let err = load_settings(&dir, None).expect_err("bad config must fail");
		assert!(matches!(err, ConfigError::TomlDecode(_, _)));
		let _ = fs::remove_dir_all(dir);
	}

	#[test]
	fn cli_data_dir_wins() {
		let dir = temp_dir("weekboard_config_cli");
		assert_eq!(resolve_data_dir(Some(dir.clone())), dir);
	}

	fn temp_dir(name: &str) -> PathBuf {
		let mut path = std::env::temp_dir();
		path.push(format!("{}_{}", name, std::process::id()));
		path
	}
}
