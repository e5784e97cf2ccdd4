//! # jrconfig - configuration of the JasperServer client
//!
//! - Embedded default configuration (`jrconfig.yaml`)
//! - Merge with `<config dir>/config.yaml`
//! - Environment variable overrides (`JRCLIENT_CONFIG__SERVER__URL=...`)
//! - Typed getters and setters, the file is rewritten on every change
//! - Lazily loaded global instance
//!
//! ## Usage
//!
//! ```no_run
//! use jrconfig::get_config;
//!
//! let config = get_config();
//! let url = config.get_server_url()?;
//! config.set_timeout_secs(60)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{info, warn};

pub mod encryption;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("jrconfig.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load jrclient configuration"));
}

pub const ENV_CONFIG_DIR: &str = "JRCLIENT_CONFIG";
pub const ENV_PREFIX: &str = "JRCLIENT_CONFIG__";
const CONFIG_DIR_NAME: &str = ".jrclient";

// Default values for configuration
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/jasperserver/services/repository";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_OUTPUT_FORMAT: &str = "PDF";
pub const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: &str) -> Result<()> {
            self.set_value($path, Value::String(value.to_string()))
        }
    };
}

/// Configuration manager
///
/// Holds the merged YAML tree behind a mutex; every setter saves the file.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.lock().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    fn lock(&self) -> MutexGuard<'_, Value> {
        // un panic pendant une écriture laisse un arbre YAML valide
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// Search order:
    /// 1. `directory` if not empty
    /// 2. the `JRCLIENT_CONFIG` environment variable
    /// 3. `.jrclient` in the current directory
    /// 4. `.jrclient` in the user's home directory
    ///
    /// The directory is created if needed and checked for read/write access.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges the external `config.yaml` if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        // les clés sont normalisées avant la fusion
        let mut default_value = Self::lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG)?);

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file = %path, "Loaded config file");
            data
        } else {
            info!(config_file = %path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value = Self::lower_keys_value(serde_yaml::from_slice(&yaml_data)?);
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = default_value;

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.lock())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    pub fn config_directory(&self) -> &str {
        &self.config_dir
    }

    pub fn config_file(&self) -> &str {
        &self.path
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// * `path` - keys from the root, e.g. `&["server", "url"]`
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock();
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                if let Some(next) = map.get(&Value::String(key.to_lowercase())) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(e) = Self::set_value_internal(config, &key_path, yaml_value) {
                    warn!(env_var = %key, error = %e, "Ignoring configuration override");
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    impl_string_config!(
        get_server_url,
        set_server_url,
        &["server", "url"],
        DEFAULT_SERVER_URL
    );

    impl_string_config!(
        get_default_format,
        set_default_format,
        &["run", "default_format"],
        DEFAULT_OUTPUT_FORMAT
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    /// Nom d'utilisateur JasperServer (obligatoire)
    pub fn get_username(&self) -> Result<String> {
        match self.get_value(&["server", "username"])? {
            Value::String(s) if !s.is_empty() => Ok(s),
            _ => Err(anyhow!("JasperServer username not configured")),
        }
    }

    pub fn set_username(&self, username: &str) -> Result<()> {
        self.set_value(&["server", "username"], Value::String(username.to_string()))
    }

    /// Mot de passe en clair; la valeur stockée peut être chiffrée ou non
    pub fn get_password(&self) -> Result<String> {
        match self.get_value(&["server", "password"])? {
            Value::String(s) => encryption::get_password(&s),
            _ => Err(anyhow!("JasperServer password not configured")),
        }
    }

    /// Stores the password encrypted with the machine key.
    pub fn set_password(&self, password: &str) -> Result<()> {
        let encrypted = encryption::encrypt_password(password)?;
        self.set_value(&["server", "password"], Value::String(encrypted))
    }

    pub fn get_timeout_secs(&self) -> Result<u64> {
        match self.get_value(&["server", "timeout_secs"]) {
            Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or(DEFAULT_TIMEOUT_SECS)),
            _ => Ok(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn set_timeout_secs(&self, seconds: u64) -> Result<()> {
        self.set_value(&["server", "timeout_secs"], Value::Number(Number::from(seconds)))
    }
}

/// Returns the global configuration instance, loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default ones.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(dir: &TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        assert_eq!(config.get_server_url().unwrap(), DEFAULT_SERVER_URL);
        assert_eq!(config.get_username().unwrap(), "jasperadmin");
        assert_eq!(config.get_password().unwrap(), "jasperadmin");
        assert_eq!(config.get_timeout_secs().unwrap(), DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.get_default_format().unwrap(), "PDF");
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");

        // le fichier fusionné est écrit au chargement
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_external_file_is_merged() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "Server:\n  URL: \"http://reports.example.com/jasperserver/services/repository\"\n  timeout_secs: 30\n",
        )
        .unwrap();

        let config = load(&dir);
        assert_eq!(
            config.get_server_url().unwrap(),
            "http://reports.example.com/jasperserver/services/repository"
        );
        assert_eq!(config.get_timeout_secs().unwrap(), 30);
        // valeurs par défaut conservées
        assert_eq!(config.get_username().unwrap(), "jasperadmin");
    }

    #[test]
    fn test_set_value_persists() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        config.set_username("reporter").unwrap();
        config.set_timeout_secs(42).unwrap();
        config.set_default_format("html").unwrap();

        let reloaded = load(&dir);
        assert_eq!(reloaded.get_username().unwrap(), "reporter");
        assert_eq!(reloaded.get_timeout_secs().unwrap(), 42);
        assert_eq!(reloaded.get_default_format().unwrap(), "html");
    }

    #[test]
    fn test_set_password_is_stored_encrypted() {
        // pas d'identifiant machine dans certains conteneurs
        if encryption::machine_key().is_err() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        config.set_password("s3cret").unwrap();

        let reloaded = load(&dir);
        match reloaded.get_value(&["server", "password"]).unwrap() {
            Value::String(stored) => {
                assert!(encryption::is_encrypted(&stored));
                assert!(!stored.contains("s3cret"));
            }
            other => panic!("unexpected value: {other:?}"),
        }
        assert_eq!(reloaded.get_password().unwrap(), "s3cret");
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        let err = config.get_value(&["server", "proxy", "host"]).unwrap_err();
        assert!(err.to_string().contains("server.proxy"));
    }

    #[test]
    fn test_empty_username_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);
        config.set_username("").unwrap();
        assert!(config.get_username().is_err());
    }

    #[test]
    fn test_env_override() {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        Config::set_value_internal(
            &mut value,
            &["SERVER", "TIMEOUT_SECS"],
            Config::convert_env_value("15"),
        )
        .unwrap();

        let timeout = Config::get_value_internal(&value, &["server", "timeout_secs"]).unwrap();
        assert_eq!(timeout, Value::Number(Number::from(15u64)));
        assert_eq!(
            Config::convert_env_value("http://host:8080/x"),
            Value::String("http://host:8080/x".to_string())
        );
    }

    #[test]
    fn test_merge_yaml() {
        let mut default: Value = serde_yaml::from_str("a:\n  b: 1\n  c: 2\nl: [1, 2]\n").unwrap();
        let external: Value = serde_yaml::from_str("a:\n  c: 3\n  d: 4\nl: [9]\n").unwrap();
        merge_yaml(&mut default, &external);

        let expected: Value =
            serde_yaml::from_str("a:\n  b: 1\n  c: 3\n  d: 4\nl: [9]\n").unwrap();
        assert_eq!(default, expected);
    }
}
