//! # escape-client
//!
//! Session runtime for the escape room game.
//!
//! This is the library a front end uses to play a session against the game
//! server. It wraps the pure state machines from escape-core in a tokio
//! event loop and performs the actual I/O.
//!
//! ## Features
//!
//! - **Transport Abstraction**: Pluggable transport layer (HTTP, mock)
//! - **Typed Gateway**: Replies decoded and classified, time-up first
//! - **Local Countdown**: 1 s tick, corrected by a 30 s server time-check
//! - **Generation Retry**: Bounded automatic retries, then a manual control
//! - **Pure State Machine**: Uses escape-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use escape_client::{ChannelSink, ClientConfig, GameSession, HttpTransport, RequestGateway};
//!
//! let config = ClientConfig::default();
//! let transport = HttpTransport::with_timeout(&config.server.base_url, config.request_timeout())?;
//! let gateway = Arc::new(RequestGateway::new(transport));
//!
//! let (sink, mut events) = ChannelSink::new();
//! let (handle, task) = GameSession::connect(gateway, config.session_config(), sink).await?;
//!
//! handle.submit("an echo")?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod gateway;
pub mod session;
pub mod sink;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use gateway::{GatewayError, RequestGateway, StartOutcome};
pub use session::{ClientError, GameSession, SessionHandle, SessionOutcome};
pub use sink::{ChannelSink, PresentationSink, RecordingSink};
pub use transport::{HttpTransport, MockTransport, Reply, Transport, TransportError};
