//! sws - small web server
//!
//! Serves static files, directory listings and CGI output over HTTP/0.9 and
//! HTTP/1.0, one request per connection.

pub mod access_log;
pub mod config;
pub mod content;
pub mod http;
pub mod server;
