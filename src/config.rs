use std::time::Duration;

use clap::Parser;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "relay-chat")]
#[command(about = "Line-oriented TCP chat relay")]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Per-peer deadline for a single broadcast write, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub write_timeout_ms: u64,

    /// Longest line a client may send before it is disconnected
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_BYTES)]
    pub max_line_bytes: usize,

    /// How long shutdown waits for connections to close on their own
    #[arg(long, default_value_t = 5)]
    pub drain_timeout_secs: u64,
}

impl ServerArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            max_line_length: self.max_line_bytes,
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "relay-client")]
#[command(about = "Terminal client for relay-chat")]
pub struct ClientArgs {
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl ClientArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for the broadcast engine.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    pub write_timeout: Duration,
    pub max_line_length: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(5),
            max_line_length: DEFAULT_MAX_LINE_BYTES,
        }
    }
}
