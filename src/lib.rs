pub mod broadcast;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use broadcast::Hub;
pub use config::{ClientArgs, HubConfig, ServerArgs};
pub use connection::{ConnId, Connection};
pub use error::ChatError;
pub use registry::Registry;
