mod common;

use clap::{CommandFactory, Parser};
use std::net::SocketAddr;
use std::time::Duration;
use sws::config::{
    Cli, Config, ConfigError, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT, FileConfig,
};

use common::TempDir;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["sws"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn load(args: &[&str]) -> Result<Config, ConfigError> {
    Config::load(cli(args))
}

#[test]
fn test_config_defaults() {
    let root = TempDir::new("cfg-defaults");
    let cfg = load(&[root.path().to_str().unwrap()]).unwrap();

    assert_eq!(cfg.root_dir, root.path());
    assert_eq!(cfg.bind_addr.port(), DEFAULT_PORT);
    assert!(cfg.bind_addr.ip().is_unspecified());
    assert!(cfg.bind_addr.is_ipv4());
    assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
    assert_eq!(cfg.timeout, Some(Duration::from_secs(60)));
    assert!(cfg.cgi_dir.is_none());
    assert!(cfg.secure.is_none());
    assert!(!cfg.debug);
}

#[test]
fn test_config_missing_root() {
    assert!(matches!(load(&[]), Err(ConfigError::MissingRoot)));
}

#[test]
fn test_config_root_must_exist_and_be_a_directory() {
    let root = TempDir::new("cfg-root");
    let file = root.write("plain.txt", "x");

    let missing = root.path().join("nope");
    assert!(matches!(
        load(&[missing.to_str().unwrap()]),
        Err(ConfigError::Io { .. })
    ));
    assert!(matches!(
        load(&[file.to_str().unwrap()]),
        Err(ConfigError::NotADirectory { .. })
    ));
}

#[test]
fn test_config_custom_address() {
    let root = TempDir::new("cfg-addr");
    let cfg = load(&["-i", "127.0.0.1", "-p", "3000", root.path().to_str().unwrap()]).unwrap();

    assert_eq!(cfg.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
}

#[test]
fn test_config_invalid_address() {
    let root = TempDir::new("cfg-badaddr");
    let result = load(&["-i", "not-an-ip", root.path().to_str().unwrap()]);

    assert!(matches!(result, Err(ConfigError::InvalidAddress(_))));
}

#[test]
fn test_config_ipv6_family_must_match() {
    let root = TempDir::new("cfg-v6");
    let dir = root.path().to_str().unwrap();

    let cfg = load(&["-6", dir]).unwrap();
    assert!(cfg.bind_addr.is_ipv6());

    let cfg = load(&["-6", "-i", "::1", dir]).unwrap();
    assert_eq!(cfg.bind_addr.ip().to_string(), "::1");

    assert!(matches!(
        load(&["-6", "-i", "127.0.0.1", dir]),
        Err(ConfigError::InvalidAddress(_))
    ));
    assert!(matches!(
        load(&["-i", "::1", dir]),
        Err(ConfigError::InvalidAddress(_))
    ));
}

#[test]
fn test_config_cgi_dir_inside_root() {
    let root = TempDir::new("cfg-cgi");
    let cgi = root.mkdir("cgi-bin");

    let cfg = load(&["-c", cgi.to_str().unwrap(), root.path().to_str().unwrap()]).unwrap();
    assert_eq!(cfg.cgi_dir.as_deref(), Some(cgi.as_path()));
}

#[test]
fn test_config_cgi_dir_outside_root_is_rejected() {
    let root = TempDir::new("cfg-cgi-root");
    let other = TempDir::new("cfg-cgi-other");

    let result = load(&["-c", other.path().to_str().unwrap(), root.path().to_str().unwrap()]);
    assert!(matches!(result, Err(ConfigError::OutsideRoot { .. })));
}

#[test]
fn test_config_secure_dir_and_key_come_together() {
    let root = TempDir::new("cfg-secure");
    let secure = root.mkdir("private");
    let dir = root.path().to_str().unwrap();

    assert!(matches!(
        load(&["-k", "secret", dir]),
        Err(ConfigError::KeyWithoutSecureDir)
    ));
    assert!(matches!(
        load(&["-s", secure.to_str().unwrap(), dir]),
        Err(ConfigError::SecureDirWithoutKey)
    ));

    let cfg = load(&["-s", secure.to_str().unwrap(), "-k", "secret", dir]).unwrap();
    let configured = cfg.secure.unwrap();
    assert_eq!(configured.dir, secure);
    assert_eq!(configured.key, "secret");
}

#[test]
fn test_config_zero_max_connections_is_rejected() {
    let root = TempDir::new("cfg-max");
    let result = load(&["--max-connections", "0", root.path().to_str().unwrap()]);

    assert!(matches!(result, Err(ConfigError::InvalidMaxConnections)));
}

#[test]
fn test_config_zero_timeout_disables_it() {
    let root = TempDir::new("cfg-timeout");
    let cfg = load(&["--timeout", "0", root.path().to_str().unwrap()]).unwrap();

    assert_eq!(cfg.timeout, None);
}

#[test]
fn test_timeout_help_covers_whole_exchange() {
    let help = Cli::command().render_long_help().to_string();

    assert!(help.contains("--timeout"));
    assert!(help.contains("body transfer included"));
}

#[test]
fn test_config_file_values_are_overridden_by_cli() {
    let root = TempDir::new("cfg-yaml");
    let yaml = format!(
        "root: {}\nport: 9000\nmax_connections: 5\ntimeout_secs: 10\nserver_name: files.local\n",
        root.path().display()
    );
    let file = FileConfig::from_yaml(&yaml).unwrap();

    let cfg = Config::from_parts(cli(&["-p", "9100"]), file).unwrap();

    assert_eq!(cfg.root_dir, root.path());
    assert_eq!(cfg.bind_addr.port(), 9100);
    assert_eq!(cfg.max_connections, 5);
    assert_eq!(cfg.timeout, Some(Duration::from_secs(10)));
    assert_eq!(cfg.server_name.as_deref(), Some("files.local"));
}

#[test]
fn test_config_file_is_read_from_disk() {
    let root = TempDir::new("cfg-file");
    let path = root.write(
        "sws.yaml",
        &format!("root: {}\ndebug: true\n", root.path().display()),
    );

    let cfg = load(&["--config", path.to_str().unwrap()]).unwrap();
    assert!(cfg.debug);
    assert_eq!(cfg.root_dir, root.path());
}

#[test]
fn test_config_file_rejects_unknown_keys() {
    assert!(FileConfig::from_yaml("listen: 0.0.0.0:80\n").is_err());
}
