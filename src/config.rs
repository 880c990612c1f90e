//! Server configuration.
//!
//! Options come from the command line (or `SWS_*` environment variables) and
//! optionally from a YAML file; command-line values win. Everything is
//! validated once at startup into an immutable [`Config`] that is shared by
//! every connection.
//!
//! ```yaml
//! root: /var/www
//! cgi_dir: /var/www/cgi-bin
//! port: 8080
//! max_connections: 20
//! ```

use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_CONNECTIONS: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HOME_BASE: &str = "/home";

/// Command-line surface.
#[derive(Debug, Clone, Parser)]
#[command(name = "sws")]
#[command(about = "Small web server for static files, directory indexes and CGI")]
#[command(version)]
pub struct Cli {
    /// Directory to serve
    #[arg(env = "SWS_ROOT")]
    pub dir: Option<PathBuf>,

    /// Execute files below this directory as CGI programs
    #[arg(short = 'c', long = "cgi-dir", env = "SWS_CGI_DIR")]
    pub cgi_dir: Option<PathBuf>,

    /// Serve one connection at a time and log to the terminal
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Address to bind to
    #[arg(short = 'i', long = "ip", env = "SWS_IP")]
    pub ip: Option<String>,

    /// Append an access log line per request to this file
    #[arg(short = 'l', long = "log-file", env = "SWS_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "SWS_PORT")]
    pub port: Option<u16>,

    /// Secure directory, requires -k
    #[arg(short = 's', long = "secure-dir")]
    pub secure_dir: Option<PathBuf>,

    /// Key for the secure directory, requires -s
    #[arg(short = 'k', long)]
    pub key: Option<String>,

    /// Listen on IPv6
    #[arg(short = '6', long = "ipv6")]
    pub ipv6: bool,

    /// YAML configuration file
    #[arg(long = "config", env = "SWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Connections served at once; extra connections are closed
    #[arg(long = "max-connections", env = "SWS_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,

    /// Seconds a whole exchange may take, body transfer included, before the
    /// connection is dropped; 0 for no limit
    #[arg(long = "timeout", env = "SWS_TIMEOUT")]
    pub timeout_secs: Option<u64>,

    /// Extension to MIME type table
    #[arg(long = "content-types", env = "SWS_CONTENT_TYPES")]
    pub content_types: Option<PathBuf>,

    /// Parent of the home directories used for /~user paths
    #[arg(long = "home-base")]
    pub home_base: Option<PathBuf>,

    /// SERVER_NAME passed to CGI programs
    #[arg(long = "server-name")]
    pub server_name: Option<String>,
}

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub root: Option<PathBuf>,
    pub cgi_dir: Option<PathBuf>,
    pub debug: Option<bool>,
    pub ip: Option<String>,
    pub log_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub secure_dir: Option<PathBuf>,
    pub key: Option<String>,
    pub ipv6: Option<bool>,
    pub max_connections: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub content_types: Option<PathBuf>,
    pub home_base: Option<PathBuf>,
    pub server_name: Option<String>,
}

impl FileConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    MissingRoot,
    Io { path: PathBuf, source: std::io::Error },
    File { path: PathBuf, source: serde_yaml::Error },
    NotADirectory { what: &'static str, path: PathBuf },
    OutsideRoot { what: &'static str, path: PathBuf },
    KeyWithoutSecureDir,
    SecureDirWithoutKey,
    InvalidAddress(String),
    InvalidMaxConnections,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRoot => write!(f, "no content directory specified"),
            ConfigError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            ConfigError::File { path, source } => {
                write!(f, "invalid config file {}: {}", path.display(), source)
            }
            ConfigError::NotADirectory { what, path } => {
                write!(f, "{} {} is not a directory", what, path.display())
            }
            ConfigError::OutsideRoot { what, path } => {
                write!(f, "{} {} must be inside the served root", what, path.display())
            }
            ConfigError::KeyWithoutSecureDir => write!(f, "key specified without secure dir"),
            ConfigError::SecureDirWithoutKey => write!(f, "secure dir specified without key"),
            ConfigError::InvalidAddress(ip) => write!(f, "invalid bind address {}", ip),
            ConfigError::InvalidMaxConnections => write!(f, "max connections must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::File { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecureDir {
    pub dir: PathBuf,
    pub key: String,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Canonical served root
    pub root_dir: PathBuf,
    /// Canonical CGI directory, inside `root_dir`
    pub cgi_dir: Option<PathBuf>,
    pub secure: Option<SecureDir>,
    pub bind_addr: SocketAddr,
    /// Sequential serving, terminal logging
    pub debug: bool,
    pub max_connections: usize,
    /// Limit on the whole exchange, from the first byte read to the last byte
    /// of the body; `None` disables it
    pub timeout: Option<Duration>,
    pub log_file: Option<PathBuf>,
    pub content_types: Option<PathBuf>,
    pub home_base: PathBuf,
    pub server_name: Option<String>,
}

fn canonical_dir(what: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    let canonical = std::fs::canonicalize(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if !canonical.is_dir() {
        return Err(ConfigError::NotADirectory {
            what,
            path: path.to_path_buf(),
        });
    }

    Ok(canonical)
}

fn inside_root(what: &'static str, root: &Path, dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if dir.starts_with(root) {
        Ok(dir)
    } else {
        Err(ConfigError::OutsideRoot { what, path: dir })
    }
}

impl Config {
    /// Merges the command line over the optional config file and validates
    /// the result.
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Self::from_parts(cli, file)
    }

    pub fn from_parts(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let root = cli.dir.or(file.root).ok_or(ConfigError::MissingRoot)?;
        let root_dir = canonical_dir("serve path", &root)?;

        let cgi_dir = match cli.cgi_dir.or(file.cgi_dir) {
            Some(dir) => Some(inside_root("cgi dir", &root_dir, canonical_dir("cgi dir", &dir)?)?),
            None => None,
        };

        let secure = match (cli.secure_dir.or(file.secure_dir), cli.key.or(file.key)) {
            (Some(dir), Some(key)) => {
                let dir = inside_root("secure dir", &root_dir, canonical_dir("secure dir", &dir)?)?;
                Some(SecureDir { dir, key })
            }
            (None, Some(_)) => return Err(ConfigError::KeyWithoutSecureDir),
            (Some(_), None) => return Err(ConfigError::SecureDirWithoutKey),
            (None, None) => None,
        };

        let ipv6 = cli.ipv6 || file.ipv6.unwrap_or(false);
        let ip = match cli.ip.or(file.ip) {
            Some(text) => {
                let ip: IpAddr = text
                    .parse()
                    .map_err(|_| ConfigError::InvalidAddress(text.clone()))?;
                if ipv6 != ip.is_ipv6() {
                    return Err(ConfigError::InvalidAddress(text));
                }
                ip
            }
            None if ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);

        let max_connections = cli
            .max_connections
            .or(file.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }

        let timeout = match cli.timeout_secs.or(file.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            root_dir,
            cgi_dir,
            secure,
            bind_addr: SocketAddr::new(ip, port),
            debug: cli.debug || file.debug.unwrap_or(false),
            max_connections,
            timeout,
            log_file: cli.log_file.or(file.log_file),
            content_types: cli.content_types.or(file.content_types),
            home_base: cli
                .home_base
                .or(file.home_base)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_BASE)),
            server_name: cli.server_name.or(file.server_name),
        })
    }
}
