#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use sws::access_log::AccessLog;
use sws::config::{Cli, Config};
use sws::content::ContentServer;
use sws::http::connection::Connection;
use sws::http::mime::ContentTypeTable;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Directory under the OS temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "sws-{}-{}-{}",
            prefix,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        // canonical so comparisons with resolved paths hold
        let path = std::fs::canonicalize(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.path.join(rel);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Writes an executable shell script.
    pub fn script(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.write(rel, &format!("#!/bin/sh\n{}", body));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub fn config(args: &[&str]) -> Config {
    let mut argv = vec!["sws"];
    argv.extend_from_slice(args);
    Config::load(Cli::try_parse_from(argv).unwrap()).unwrap()
}

pub fn content_server(config: &Config) -> Arc<ContentServer> {
    Arc::new(ContentServer::new(config, Arc::new(ContentTypeTable::builtin())))
}

pub fn local_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Runs one connection over an in-memory pipe and returns everything the
/// server wrote.
pub async fn exchange(content: Arc<ContentServer>, raw: &[u8]) -> Vec<u8> {
    let (mut client, server) = tokio::io::duplex(1 << 20);

    let handler = tokio::spawn(async move {
        let mut conn = Connection::new(
            server,
            "127.0.0.1",
            local_addr(),
            content,
            Arc::new(AccessLog::disabled()),
        );
        conn.run().await
    });

    client.write_all(raw).await.unwrap();
    client.shutdown().await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    handler.await.unwrap().unwrap();
    out
}

/// Splits a raw response into its head (without the blank line) and body.
pub fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    (
        String::from_utf8_lossy(&raw[..end]).into_owned(),
        raw[end + 4..].to_vec(),
    )
}

pub fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.split("\r\n").skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case(name).then(|| value.trim())
    })
}
