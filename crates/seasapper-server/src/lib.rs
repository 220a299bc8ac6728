//! # Seasapper server
//!
//! Authoritative WebSocket server for Seasapper, a two-player naval game
//! that mixes fleet placement with minesweeper-style hints.
//!
//! Clients send JSON [`ClientMessage`](seasapper_protocol::ClientMessage)s
//! over a WebSocket; each room runs as its own task and answers with
//! [`ServerMessage`](seasapper_protocol::ServerMessage)s.
//!
//! ```rust,no_run
//! use seasapper_server::{SapperServer, ServerConfig};
//!
//! # async fn start() -> Result<(), seasapper_server::ServerError> {
//! let server = SapperServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ADDR_VAR, CONFIG_VAR, ServerConfig, load_rules};
pub use error::ServerError;
pub use server::{SapperServer, SapperServerBuilder};
