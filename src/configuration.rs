use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub email: EmailSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
    /// External base URL used to build links in outbound emails.
    pub base_url: String,
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
}

/// Authentication settings.
///
/// Read once at startup and injected into the components that need them;
/// nothing in the auth core reads the environment at call time.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// Session token signing secret. Required, no default.
    pub secret: String,
    /// Session token lifetime in seconds (default 1 hour).
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,
    /// When true the session token travels in an HttpOnly cookie;
    /// otherwise in the `Authorization: Bearer` header. The same flag
    /// drives both issuance and verification.
    #[serde(default)]
    pub cookie_auth: bool,
    /// When true, accounts must verify their email before logging in.
    #[serde(default)]
    pub email_verification: bool,
    /// Sets the `Secure` attribute on the session cookie (TLS deployments).
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_session_ttl() -> i64 {
    3600
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailSettings {
    /// Base URL of the outbound email delivery service.
    pub base_url: String,
    pub sender: String,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .build()?;
    settings.try_deserialize::<Settings>()
}
