//! Extension pour intégrer la configuration JasperServer dans jrconfig
//!
//! [`JasperConfigExt`] adds typed accessors on top of `jrconfig::Config`:
//! the raw values are checked and converted to the types the client uses.

use crate::models::OutputFormat;
use crate::transport::endpoint_from_url;
use anyhow::{Result, anyhow};
use jrconfig::Config;
use std::time::Duration;

/// Trait d'extension pour la configuration du client JasperServer
///
/// # Exemple
///
/// ```rust,ignore
/// use jrconfig::get_config;
/// use jrclient::JasperConfigExt;
///
/// let config = get_config();
/// let (username, _password) = config.get_jasper_credentials()?;
/// println!("JasperServer user: {}", username);
/// ```
pub trait JasperConfigExt {
    /// Service endpoint, `?wsdl` stripped.
    ///
    /// # Errors
    ///
    /// Retourne une erreur si l'URL configurée n'est pas une URL http(s)
    fn get_jasper_endpoint(&self) -> Result<String>;

    /// (username, password), password decrypted.
    fn get_jasper_credentials(&self) -> Result<(String, String)>;

    fn get_jasper_timeout(&self) -> Result<Duration>;

    fn set_jasper_timeout(&self, timeout: Duration) -> Result<()>;

    /// Default format of `run`.
    ///
    /// # Errors
    ///
    /// Retourne une erreur si le format configuré n'est pas accepté par
    /// `runReport`
    fn get_jasper_default_format(&self) -> Result<OutputFormat>;

    fn set_jasper_default_format(&self, format: OutputFormat) -> Result<()>;
}

impl JasperConfigExt for Config {
    fn get_jasper_endpoint(&self) -> Result<String> {
        let url = self.get_server_url()?;
        endpoint_from_url(&url).map_err(|e| anyhow!("Invalid server.url: {}", e))
    }

    fn get_jasper_credentials(&self) -> Result<(String, String)> {
        let username = self.get_username()?;
        let password = self.get_password()?;
        Ok((username, password))
    }

    fn get_jasper_timeout(&self) -> Result<Duration> {
        match self.get_timeout_secs()? {
            0 => Err(anyhow!("server.timeout_secs must be positive")),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    fn set_jasper_timeout(&self, timeout: Duration) -> Result<()> {
        self.set_timeout_secs(timeout.as_secs().max(1))
    }

    fn get_jasper_default_format(&self) -> Result<OutputFormat> {
        let format = self.get_default_format()?;
        format
            .parse()
            .map_err(|f| anyhow!("Unsupported run.default_format: {}", f))
    }

    fn set_jasper_default_format(&self, format: OutputFormat) -> Result<()> {
        self.set_default_format(format.as_str())
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

        assert_eq!(
            config.get_jasper_endpoint().unwrap(),
            "http://localhost:8080/jasperserver/services/repository"
        );
        assert_eq!(config.get_jasper_timeout().unwrap(), Duration::from_secs(300));
        assert_eq!(config.get_jasper_default_format().unwrap(), OutputFormat::Pdf);

        let (username, password) = config.get_jasper_credentials().unwrap();
        assert_eq!(username, "jasperadmin");
        assert_eq!(password, "jasperadmin");
    }

    #[test]
    fn test_wsdl_url_and_format_from_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "server:\n  url: \"https://reports.example.com/jasperserver/services/repository?wsdl\"\n  timeout_secs: 30\nrun:\n  default_format: \"csv\"\n",
        )
        .unwrap();
        let config = load(&dir);

        assert_eq!(
            config.get_jasper_endpoint().unwrap(),
            "https://reports.example.com/jasperserver/services/repository"
        );
        assert_eq!(config.get_jasper_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.get_jasper_default_format().unwrap(), OutputFormat::Csv);
    }

    #[test]
    fn test_invalid_values() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        config.set_default_format("DOCX").unwrap();
        assert!(config.get_jasper_default_format().is_err());

        config.set_server_url("not a url").unwrap();
        assert!(config.get_jasper_endpoint().is_err());

        config.set_timeout_secs(0).unwrap();
        assert!(config.get_jasper_timeout().is_err());
    }

    #[test]
    fn test_setters() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir);

        config.set_jasper_timeout(Duration::from_secs(42)).unwrap();
        config.set_jasper_default_format(OutputFormat::Html).unwrap();

        let reloaded = load(&dir);
        assert_eq!(reloaded.get_jasper_timeout().unwrap(), Duration::from_secs(42));
        assert_eq!(reloaded.get_jasper_default_format().unwrap(), OutputFormat::Html);
    }
}
