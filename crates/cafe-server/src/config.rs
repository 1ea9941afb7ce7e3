use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

use cafe_api::SessionSettings;

/// Placeholder secret used when `SECRET_KEY` is unset. Fine for local runs only.
pub const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    File(PathBuf),
    Memory,
}

pub struct AdminAccount {
    pub username: String,
    pub password: String,
}

pub struct Config {
    pub secret_key: String,
    pub database: DatabaseTarget,
    pub addr: SocketAddr,
    pub static_dir: PathBuf,
    pub session: SessionSettings,
    pub admin: Option<AdminAccount>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let secret_key = var("SECRET_KEY", DEV_SECRET);
        let database = parse_database_url(&var("DATABASE_URL", "sqlite:///cafes.db"))?;

        let host = var("CAFES_HOST", "0.0.0.0");
        let port: u16 = var("CAFES_PORT", "5000")
            .parse()
            .context("CAFES_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let static_dir = PathBuf::from(var("CAFES_STATIC_DIR", "./static"));

        let ttl_hours: i64 = var("CAFES_SESSION_TTL_HOURS", "168")
            .parse()
            .context("CAFES_SESSION_TTL_HOURS must be a whole number of hours")?;
        if ttl_hours <= 0 {
            bail!("CAFES_SESSION_TTL_HOURS must be positive");
        }
        let ttl = Duration::try_hours(ttl_hours).context("CAFES_SESSION_TTL_HOURS is too large")?;
        let secure_cookies = parse_bool("CAFES_SECURE_COOKIES", &var("CAFES_SECURE_COOKIES", "false"))?;

        let admin = match (lookup("CAFES_ADMIN_USERNAME"), lookup("CAFES_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminAccount { username, password })
            }
            (None, None) => None,
            _ => bail!("CAFES_ADMIN_USERNAME and CAFES_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            secret_key,
            database,
            addr,
            static_dir,
            session: SessionSettings {
                ttl,
                secure_cookies,
            },
            admin,
        })
    }

    pub fn favicon_path(&self) -> PathBuf {
        self.static_dir.join("assets/images/favicon.ico")
    }
}

/// Accepts SQLAlchemy-style SQLite URLs as well as bare paths.
/// `sqlite:///cafes.db` is relative, `sqlite:////var/db/cafes.db` absolute.
pub fn parse_database_url(url: &str) -> Result<DatabaseTarget> {
    let url = url.trim();
    if url == ":memory:" || url == "sqlite::memory:" || url == "sqlite://" {
        return Ok(DatabaseTarget::Memory);
    }

    if let Some(path) = url.strip_prefix("sqlite:///") {
        return Ok(DatabaseTarget::File(PathBuf::from(path)));
    }
    if let Some(path) = url.strip_prefix("sqlite://") {
        return Ok(DatabaseTarget::File(PathBuf::from(path)));
    }
    if let Some((scheme, _)) = url.split_once("://") {
        bail!("unsupported DATABASE_URL scheme '{}', only sqlite is available", scheme);
    }
    if url.is_empty() {
        bail!("DATABASE_URL is empty");
    }

    Ok(DatabaseTarget::File(PathBuf::from(url)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{} must be a boolean, got '{}'", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.secret_key, DEV_SECRET);
        assert_eq!(cfg.database, DatabaseTarget::File("cafes.db".into()));
        assert_eq!(cfg.addr.port(), 5000);
        assert_eq!(cfg.session.ttl, Duration::hours(168));
        assert!(!cfg.session.secure_cookies);
        assert!(cfg.admin.is_none());
        assert_eq!(
            cfg.favicon_path(),
            PathBuf::from("./static/assets/images/favicon.ico")
        );
    }

    #[test]
    fn test_database_urls() {
        assert_eq!(
            parse_database_url("sqlite:////var/lib/cafes.db").unwrap(),
            DatabaseTarget::File("/var/lib/cafes.db".into())
        );
        assert_eq!(
            parse_database_url("sqlite://cafes.db").unwrap(),
            DatabaseTarget::File("cafes.db".into())
        );
        assert_eq!(parse_database_url(":memory:").unwrap(), DatabaseTarget::Memory);
        assert_eq!(
            parse_database_url("data/cafes.db").unwrap(),
            DatabaseTarget::File("data/cafes.db".into())
        );
        assert!(parse_database_url("postgres://localhost/cafes").is_err());
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(config(&[("CAFES_PORT", "eighty")]).is_err());
        assert!(config(&[("CAFES_SESSION_TTL_HOURS", "0")]).is_err());
        assert!(config(&[("CAFES_SECURE_COOKIES", "maybe")]).is_err());
        assert!(config(&[("CAFES_ADMIN_USERNAME", "root")]).is_err());
    }

    #[test]
    fn test_admin_account_and_secure_cookies() {
        let cfg = config(&[
            ("CAFES_ADMIN_USERNAME", "root"),
            ("CAFES_ADMIN_PASSWORD", "pw"),
            ("CAFES_SECURE_COOKIES", "true"),
            ("SECRET_KEY", "s3cret"),
        ])
        .unwrap();
        assert_eq!(cfg.admin.unwrap().username, "root");
        assert!(cfg.session.secure_cookies);
        assert_eq!(cfg.secret_key, "s3cret");
    }
}
