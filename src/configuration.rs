use crate::error::ConfigError as SettingsError;

/// Longest lifetime either token may be configured with (ten years)
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    /// `APP_PLATFORM`; only `DEV` unlocks the admin routes
    #[serde(default)]
    pub platform: Platform,
}

/// Deployment the service runs in
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(from = "String")]
pub enum Platform {
    Dev,
    #[default]
    Other,
}

impl Platform {
    pub fn is_dev(self) -> bool {
        self == Platform::Dev
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        if value == "DEV" {
            Platform::Dev
        } else {
            Platform::Other
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing settings
///
/// The issuer is fixed; see `auth::TOKEN_ISSUER`.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,   // seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,  // seconds
}

impl JwtSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.secret.is_empty() {
            return Err(SettingsError::MissingRequired("jwt.secret".to_string()));
        }
        check_ttl("jwt.access_token_expiry", self.access_token_expiry)?;
        check_ttl("jwt.refresh_token_expiry", self.refresh_token_expiry)?;
        Ok(())
    }
}

fn check_ttl(name: &str, seconds: i64) -> Result<(), SettingsError> {
    if seconds <= 0 {
        return Err(SettingsError::InvalidValue(format!("{} must be positive", name)));
    }
    if seconds > MAX_TOKEN_TTL_SECONDS {
        return Err(SettingsError::InvalidValue(format!(
            "{} must be at most {} seconds",
            name, MAX_TOKEN_TTL_SECONDS
        )));
    }
    Ok(())
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_token_expiry() -> i64 {
    60 * 60
}

fn default_refresh_token_expiry() -> i64 {
    60 * 60 * 24
}

/// Load settings from `configuration.yaml` (optional) overlaid with
/// `APP_`-prefixed environment variables, e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = JwtSettings::new("secret");
        assert_eq!(settings.access_token_expiry, 3600);
        assert_eq!(settings.refresh_token_expiry, 86400);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let settings = JwtSettings::new("");
        assert!(matches!(settings.validate(), Err(SettingsError::MissingRequired(_))));
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let mut settings = JwtSettings::new("secret");
        settings.refresh_token_expiry = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn test_platform_from_setting() {
        assert_eq!(Platform::from("DEV".to_string()), Platform::Dev);
        assert_eq!(Platform::from("dev".to_string()), Platform::Other);
        assert_eq!(Platform::from("PROD".to_string()), Platform::Other);
        assert!(!Platform::default().is_dev());
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let mut settings = JwtSettings::new("secret");
        settings.refresh_token_expiry = i64::MAX / 2;
        assert!(matches!(settings.validate(), Err(SettingsError::InvalidValue(_))));

        let mut settings = JwtSettings::new("secret");
        settings.access_token_expiry = MAX_TOKEN_TTL_SECONDS + 1;
        assert!(matches!(settings.validate(), Err(SettingsError::InvalidValue(_))));

        settings.access_token_expiry = MAX_TOKEN_TTL_SECONDS;
        assert!(settings.validate().is_ok());
    }
}
