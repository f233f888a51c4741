// ABOUTME: Environment-driven configuration for the web server, database, cookies and mail
// ABOUTME: Falls back to logged defaults; a missing or short secret key is a startup error

use anyhow::{anyhow, Result};
use std::{env, fmt::Display, net::SocketAddr, str::FromStr};
use tracing::{info, warn};

/// Minimum secret length accepted for deriving the cookie signing key.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub secret_key: String,
    pub cookie_secure: bool,
    pub static_dir: String,
    pub site_author: String,
    pub mail: MailSettings,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Fixed inbox receiving contact form messages.
    pub inbox: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY").ok_or_else(|| anyhow!("SECRET_KEY must be set"))?;
        if secret_key.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "SECRET_KEY must be at least {} bytes long",
                MIN_SECRET_LEN
            ));
        }

        let username = load_or(&lookup, "SMTP_USERNAME", "");
        let inbox = lookup("CONTACT_INBOX").unwrap_or_else(|| username.clone());

        Ok(Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:3000")?,
            database_url: load_or(&lookup, "DATABASE_URL", "sqlite:blog.db?mode=rwc"),
            secret_key,
            cookie_secure: try_load(&lookup, "COOKIE_SECURE", "false")?,
            static_dir: load_or(&lookup, "STATIC_DIR", "static"),
            site_author: load_or(&lookup, "SITE_AUTHOR", "Portfolio"),
            mail: MailSettings {
                smtp_host: load_or(&lookup, "SMTP_HOST", "smtp.gmail.com"),
                smtp_port: try_load(&lookup, "SMTP_PORT", "587")?,
                username,
                password: lookup("SMTP_PASSWORD").unwrap_or_default(),
                inbox,
            },
        })
    }
}

impl MailSettings {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

fn load_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = load_or(lookup, key, default);
    raw.parse::<T>().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Environment variable {key} is misconfigured: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", SECRET)])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.database_url, "sqlite:blog.db?mode=rwc");
        assert!(!config.cookie_secure);
        assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
        assert_eq!(config.mail.smtp_port, 587);
        assert!(!config.mail.is_configured());
    }

    #[test]
    fn test_missing_secret_rejected() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("SECRET_KEY", "short")])).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", SECRET),
            ("SMTP_PORT", "not-a-port"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_inbox_defaults_to_sender() {
        let config = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", SECRET),
            ("SMTP_USERNAME", "me@example.com"),
            ("SMTP_PASSWORD", "app-password"),
        ]))
        .unwrap();

        assert_eq!(config.mail.inbox, "me@example.com");
        assert!(config.mail.is_configured());
    }
}
