//! Client configuration
//!
//! Values are resolved once at startup with the precedence
//! CLI flags > environment variables > config file > defaults, and the
//! resulting [`ClientConfig`] is passed down explicitly.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tunny_common::{
    Result, TunnelError,
    constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_SUBDOMAIN, ENV_TOKEN},
    generate_tunnel_id,
    validation::{validate_subdomain, validate_target, validate_tunnel_id},
};
use url::Url;

use crate::cli::ConnectArgs;

/// Persisted configuration at `~/.tunny/config.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub subdomain: String,
}

impl FileConfig {
    pub fn new(token: impl Into<String>, subdomain: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            subdomain: subdomain.into(),
        }
    }

    /// Location of the config file under the user's home directory
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| TunnelError::Config("cannot determine home directory".to_string()))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&data).map_err(|e| {
            TunnelError::Config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Write to `path` as indented JSON, creating the parent directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Override values with non-empty `TUNNY_TOKEN` / `TUNNY_SUBDOMAIN`
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.token = token;
        }
        if let Some(subdomain) = lookup(ENV_SUBDOMAIN).filter(|v| !v.is_empty()) {
            self.subdomain = subdomain;
        }
        self
    }
}

/// Credentials attached to the connection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub subdomain: String,
    pub tunnel_id: String,
}

/// Fully resolved configuration for `tunny connect`
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: Url,
    pub credentials: Credentials,
    pub target: String,
    pub drain_timeout: Duration,
    pub dev: bool,
}

impl ClientConfig {
    /// Merge CLI flags over `base` (file config with env overrides applied)
    pub fn resolve(args: &ConnectArgs, base: FileConfig) -> Result<Self> {
        validate_target(&args.target)?;

        let server_url = Url::parse(&args.server)
            .map_err(|e| TunnelError::Config(format!("invalid server URL: {}", e)))?;
        if !matches!(server_url.scheme(), "ws" | "wss") {
            return Err(TunnelError::Config(format!(
                "server URL must use ws:// or wss://, got {}",
                server_url.scheme()
            )));
        }

        let token = flag_or(&args.token, base.token);
        let subdomain = flag_or(&args.subdomain, base.subdomain);
        validate_subdomain(&subdomain)?;

        let tunnel_id = match args.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                validate_tunnel_id(id)?;
                id.to_string()
            }
            None => generate_tunnel_id(),
        };

        Ok(Self {
            server_url,
            credentials: Credentials {
                token,
                subdomain,
                tunnel_id,
            },
            target: args.target.clone(),
            drain_timeout: Duration::from_secs(args.drain_timeout),
            dev: args.dev,
        })
    }

    pub fn tunnel_id(&self) -> &str {
        &self.credentials.tunnel_id
    }

    /// Server URL with `token`, `subdomain` and `tunnel_id` query parameters
    pub fn connect_url(&self) -> Url {
        let mut url = self.server_url.clone();
        url.query_pairs_mut()
            .append_pair("token", &self.credentials.token)
            .append_pair("subdomain", &self.credentials.subdomain)
            .append_pair("tunnel_id", &self.credentials.tunnel_id);
        url
    }

    /// Public URL the broker serves this tunnel under
    ///
    /// A `wss` server is assumed to terminate TLS for public traffic too, so
    /// the URL uses `https`; a plain `ws` server gets `http`. Default ports
    /// are omitted.
    pub fn public_url(&self) -> String {
        let scheme = if self.server_url.scheme() == "wss" {
            "https"
        } else {
            "http"
        };
        format!(
            "{}://{}/{}",
            scheme,
            host_with_port(&self.server_url),
            self.credentials.tunnel_id
        )
    }
}

/// Base URL of the broker's HTTP management API
///
/// `ws` maps to `http`, `wss` to `https`, and a trailing `/ws` path is removed.
pub fn http_base_url(server: &str) -> Result<String> {
    let url =
        Url::parse(server).map_err(|e| TunnelError::Config(format!("invalid server URL: {}", e)))?;
    let scheme = match url.scheme() {
        "wss" | "https" => "https",
        "ws" | "http" => "http",
        other => {
            return Err(TunnelError::Config(format!(
                "unsupported server URL scheme: {}",
                other
            )));
        }
    };

    let path = url.path().trim_end_matches('/');
    let path = path.strip_suffix("/ws").unwrap_or(path);
    Ok(format!("{}://{}{}", scheme, host_with_port(&url), path))
}

/// `host[:port]`, omitting the scheme's default port
fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn flag_or(flag: &Option<String>, fallback: String) -> String {
    match flag {
        Some(value) if !value.is_empty() => value.clone(),
        _ => fallback,
    }
}
