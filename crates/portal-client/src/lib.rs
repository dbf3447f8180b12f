//! Client side of Portal: join a room and keep a local copy of its text in
//! sync.
//!
//! [`SyncClient`] is the pure state machine. It never touches a socket, so
//! it can be driven from anything. [`SyncDriver`] runs one on a Tokio task
//! against a real WebSocket. [`create_room`] and [`room_exists`] talk to the
//! HTTP endpoints.
//!
//! # Quick start
//!
//! ```no_run
//! use portal_client::{ClientConfig, ClientEvent, SyncDriver, create_room};
//!
//! # async fn demo() -> Result<(), portal_client::ClientError> {
//! let config = ClientConfig::from_env()?;
//! let code = create_room(&config).await?;
//!
//! let (driver, mut events) = SyncDriver::spawn(&config, code);
//! driver.edit("hello")?;
//! while let Some(event) = events.recv().await {
//!     if let ClientEvent::RemoteText(text) = event {
//!         println!("room now reads: {text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod client;
mod config;
mod driver;
mod error;

pub use api::{create_room, room_exists};
pub use client::{ClientState, Inbound, SyncClient};
pub use config::ClientConfig;
pub use driver::{ClientEvent, SyncDriver};
pub use error::ClientError;
