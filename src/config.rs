//! Service configuration.

use std::net::SocketAddr;

const DEFAULT_PORT: u16 = 3000;

/// Runtime settings for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
}

impl ServiceConfig {
    /// Creates a `ServiceConfig` with default values.
    pub fn new() -> Self {
        ServiceConfig { port: DEFAULT_PORT }
    }

    /// Creates a `ServiceConfig` from environment variables.
    ///
    /// Reads `DISPATCH_PORT` for the listen port; anything unset or
    /// unparsable falls back to the default.
    pub fn from_env() -> Self {
        ServiceConfig {
            port: port_from(std::env::var("DISPATCH_PORT").ok().as_deref()),
        }
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn port_from(raw: Option<&str>) -> u16 {
    match raw {
        None => DEFAULT_PORT,
        Some(value) => value.parse::<u16>().unwrap_or_else(|_| {
            tracing::warn!(value, "unparsable DISPATCH_PORT, using default");
            DEFAULT_PORT
        }),
    }
}
