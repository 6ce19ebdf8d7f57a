//! Common utilities shared by the CLI, the runner and the mock service

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Parse a "listening at:" address from service output.
/// Handles IPv6 format [::]:PORT by converting to 127.0.0.1:PORT
pub fn parse_listen_address(line: &str) -> Option<String> {
    let addr_start = line.find("listening at:")?;
    let addr = line[addr_start + "listening at:".len()..].trim();
    if let Some(port) = addr.strip_prefix("[::]:") {
        return Some(format!("127.0.0.1:{port}"));
    }
    Some(addr.to_string())
}
