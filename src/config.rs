use crate::error::{Error, Result};
use crate::preset::CitationStandard;
use std::fmt;
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PRO_MODEL: &str = "gemini-3-pro-preview";
const DEFAULT_FLASH_MODEL: &str = "gemini-3-flash-preview";
const FALLBACK_LIBRARY_DIR: &str = ".aurora";

/// Configuration for the research assistant.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Clone)]
#[non_exhaustive]
pub struct Config {
    /// API key sent to the generation service
    pub api_key: String,

    /// Base URL of the generation API
    pub base_url: String,

    /// Model used for long structured output
    pub pro_model: String,

    /// Model used for short answers
    pub flash_model: String,

    /// Directory holding the persisted library
    pub library_dir: PathBuf,

    /// Citation standard selected when none is given
    pub default_standard: CitationStandard,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("pro_model", &self.pro_model)
            .field("flash_model", &self.flash_model)
            .field("library_dir", &self.library_dir)
            .field("default_standard", &self.default_standard)
            .finish()
    }
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use aurora_research::Config;
    ///
    /// let config = Config::builder()
    ///     .api_key("test-key")
    ///     .library_dir("./library")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API key is empty
    /// - The base URL is not http(s)
    /// - A model name is empty
    /// - The library path exists but is not a directory
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::config(
                "api_key must not be empty (set GEMINI_API_KEY or pass --api-key)",
            ));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::config(format!(
                "base_url must start with http:// or https://: {}",
                self.base_url
            )));
        }

        if self.pro_model.trim().is_empty() || self.flash_model.trim().is_empty() {
            return Err(Error::config("model names must not be empty"));
        }

        if self.library_dir.exists() && !self.library_dir.is_dir() {
            return Err(Error::config(format!(
                "Library path is not a directory: {}",
                self.library_dir.display()
            )));
        }

        Ok(())
    }

    /// Platform data directory for the library, falling back to `./.aurora`.
    #[must_use]
    pub fn default_library_dir() -> PathBuf {
        directories::ProjectDirs::from("br", "aurora", "aurora")
            .map_or_else(|| PathBuf::from(FALLBACK_LIBRARY_DIR), |dirs| {
                dirs.data_dir().to_path_buf()
            })
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    pro_model: Option<String>,
    flash_model: Option<String>,
    library_dir: Option<PathBuf>,
    default_standard: Option<CitationStandard>,
}

impl ConfigBuilder {
    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model used for long structured output.
    #[must_use]
    pub fn pro_model(mut self, model: impl Into<String>) -> Self {
        self.pro_model = Some(model.into());
        self
    }

    /// Sets the model used for short answers.
    #[must_use]
    pub fn flash_model(mut self, model: impl Into<String>) -> Self {
        self.flash_model = Some(model.into());
        self
    }

    /// Sets the directory holding the persisted library.
    #[must_use]
    pub fn library_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(path.into());
        self
    }

    /// Sets the default citation standard.
    #[must_use]
    pub fn default_standard(mut self, standard: CitationStandard) -> Self {
        self.default_standard = Some(standard);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            api_key: self.api_key.unwrap_or_default(),
            base_url: self
                .base_url
                .map_or_else(|| DEFAULT_BASE_URL.to_string(), |u| u.trim_end_matches('/').to_string()),
            pro_model: self.pro_model.unwrap_or_else(|| DEFAULT_PRO_MODEL.to_string()),
            flash_model: self
                .flash_model
                .unwrap_or_else(|| DEFAULT_FLASH_MODEL.to_string()),
            library_dir: self.library_dir.unwrap_or_else(Config::default_library_dir),
            default_standard: self.default_standard.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .api_key("key")
            .library_dir(temp.path())
            .build()
            .unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.pro_model, DEFAULT_PRO_MODEL);
        assert_eq!(config.flash_model, DEFAULT_FLASH_MODEL);
        assert_eq!(config.default_standard, CitationStandard::Abnt);
    }

    #[test]
    fn test_missing_api_key() {
        let result = Config::builder().library_dir("lib").build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = Config::builder()
            .api_key("key")
            .base_url("ftp://example.org")
            .library_dir("lib")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = Config::builder()
            .api_key("key")
            .base_url("http://localhost:8080/v1beta/")
            .library_dir("lib")
            .build()
            .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080/v1beta");
    }

    #[test]
    fn test_library_path_must_be_directory() {
        use assert_fs::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("library.json");
        file.write_str("[]").unwrap();

        let result = Config::builder()
            .api_key("key")
            .library_dir(file.path())
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::builder()
            .api_key("super-secret")
            .library_dir("lib")
            .build()
            .unwrap();

        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
