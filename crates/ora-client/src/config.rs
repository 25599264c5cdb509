//! Client configuration.

use std::fmt;
use std::time::Duration;

use crate::error::Error;

/// Default Oracle listener port.
pub const DEFAULT_PORT: u16 = 1521;

/// Authentication credentials.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Credentials {
    /// Database username and password.
    Password {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// External authentication (OS authentication or a wallet), written as
    /// `/` in connect strings.
    External,
}

impl Credentials {
    /// Username/password credentials.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } => Some(username),
            Self::External => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::External => f.write_str("External"),
        }
    }
}

/// Configuration for connecting to an Oracle database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener hostname or IP address.
    pub host: String,

    /// Listener port (default: 1521).
    pub port: u16,

    /// Database service name.
    pub service_name: String,

    /// Authentication credentials.
    pub credentials: Credentials,

    /// Program name reported in `V$SESSION.PROGRAM`.
    pub program: String,

    /// Timeout for opening a session.
    pub connect_timeout: Duration,

    /// Driver-level round-trip timeout, if any.
    pub call_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            service_name: String::new(),
            credentials: Credentials::External,
            program: "ora-access".to_string(),
            connect_timeout: Duration::from_secs(30),
            call_timeout: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connect string.
    ///
    /// Two forms are accepted. EZConnect:
    /// ```text
    /// scott/tiger@db.example.com:1521/ORCLPDB1
    /// ```
    /// and key-value pairs:
    /// ```text
    /// Host=db.example.com;Port=1521;Service Name=ORCLPDB1;User Id=scott;Password=tiger;
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let conn_str = conn_str.trim();
        if conn_str.is_empty() {
            return Err(Error::Config("empty connection string".into()));
        }

        let config = if is_key_value(conn_str) {
            Self::parse_key_value(conn_str)?
        } else {
            let mut config = Self::default();
            config.apply_ezconnect(conn_str)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_key_value(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();
        let mut username: Option<String> = None;
        let mut password: Option<String> = None;

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "host" | "server" => config.host = value.to_string(),
                "port" => config.port = parse_port(value)?,
                "service name" | "service_name" | "service" => {
                    config.service_name = value.to_string();
                }
                "data source" => config.apply_ezconnect(value)?,
                "user id" | "uid" | "user" => username = Some(value.to_string()),
                "password" | "pwd" => password = Some(value.to_string()),
                "program" | "application name" => config.program = value.to_string(),
                "connect timeout" | "connection timeout" => {
                    config.connect_timeout = parse_secs(value)?;
                }
                "call timeout" => config.call_timeout = Some(parse_secs(value)?),
                _ => {
                    tracing::debug!(key = key, "ignoring unknown connection string option");
                }
            }
        }

        match (username, password) {
            (Some(u), p) if u != "/" => {
                config.credentials = Credentials::password(u, p.unwrap_or_default());
            }
            (None, Some(_)) => {
                return Err(Error::Config("password given without a user id".into()));
            }
            _ => {}
        }

        Ok(config)
    }

    /// Apply `[user[/password]@][//]host[:port][/service]`.
    fn apply_ezconnect(&mut self, s: &str) -> Result<(), Error> {
        let (creds, address) = match s.rsplit_once('@') {
            Some((creds, address)) => (Some(creds), address),
            None => (None, s),
        };

        if let Some(creds) = creds {
            self.credentials = match creds.split_once('/') {
                Some(("", "")) => Credentials::External,
                Some((user, password)) => Credentials::password(user, password),
                None if creds.is_empty() => Credentials::External,
                None => Credentials::password(creds, ""),
            };
        }

        let address = address.trim_start_matches("//");
        let (host_port, service) = match address.split_once('/') {
            Some((hp, svc)) => (hp, Some(svc)),
            None => (address, None),
        };

        let (host, port) = split_host_port(host_port)?;
        if !host.is_empty() {
            self.host = host.to_string();
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(service) = service {
            // Drop any `:server_type/instance` suffix (`svc:pooled`).
            let service = service.split(':').next().unwrap_or(service);
            self.service_name = service.to_string();
        }

        Ok(())
    }

    /// Check the configuration for obvious mistakes.
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must not be 0".into()));
        }
        if self.service_name.trim().is_empty() {
            return Err(Error::Config("service name must not be empty".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::Config("connect timeout must be positive".into()));
        }
        Ok(())
    }

    /// EZConnect address without credentials, suitable for logs.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.service_name)
    }

    /// Set the listener host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the listener port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the service name.
    #[must_use]
    pub fn service_name(mut self, service: impl Into<String>) -> Self {
        self.service_name = service.into();
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the program name.
    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the driver call timeout.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

fn is_key_value(s: &str) -> bool {
    // An EZConnect password may contain '=', so only treat the string as
    // key-value when the first key looks like a plain option name.
    s.split_once('=')
        .is_some_and(|(key, _)| !key.contains(['@', '/', ':']))
}

fn split_host_port(s: &str) -> Result<(&str, Option<u16>), Error> {
    // [::1]:1521
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| Error::Config(format!("invalid address: {s}")))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None => None,
        };
        return Ok((host, port));
    }

    match s.rsplit_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((s, None)),
    }
}

fn parse_port(value: &str) -> Result<u16, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid port: {value}")))
}

fn parse_secs(value: &str) -> Result<Duration, Error> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid timeout: {value}")))?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ezconnect_parsing() {
        let config = Config::from_connection_string("scott/tiger@db.example.com:1522/ORCLPDB1")
            .unwrap();

        assert_eq!(config.host, "db.example.com");
        assert_eq!(config.port, 1522);
        assert_eq!(config.service_name, "ORCLPDB1");
        assert_eq!(config.credentials, Credentials::password("scott", "tiger"));
    }

    #[test]
    fn test_ezconnect_defaults_port_and_accepts_slashes() {
        let config = Config::from_connection_string("//dbhost/FREEPDB1").unwrap();
        assert_eq!(config.host, "dbhost");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.credentials, Credentials::External);
    }

    #[test]
    fn test_ezconnect_password_with_special_chars() {
        let config = Config::from_connection_string("app/p=ss@w0rd@[::1]:1521/svc").unwrap();
        assert_eq!(config.host, "::1");
        assert_eq!(config.credentials, Credentials::password("app", "p=ss@w0rd"));
    }

    #[test]
    fn test_key_value_parsing() {
        let config = Config::from_connection_string(
            "Host=localhost;Port=1530;Service Name=XEPDB1;User Id=hr;Password=secret;Call Timeout=5;",
        )
        .unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1530);
        assert_eq!(config.service_name, "XEPDB1");
        assert_eq!(config.credentials.username(), Some("hr"));
        assert_eq!(config.call_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_service_is_rejected() {
        let err = Config::from_connection_string("scott/tiger@localhost:1521").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_connection_string("Host=x;Port=abc;Service=y").unwrap_err();
        assert!(err.to_string().contains("invalid port"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::password("scott", "tiger");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("scott"));
        assert!(!rendered.contains("tiger"));
    }
}
