//! Word Pulse room server.
//!
//! Participants create or join named rooms over a WebSocket, submit words,
//! and every member of the room receives the room's full word list whenever it
//! changes.
//!
//! # Architecture
//!
//! Room state is driven by [`ServerDriver`], a Sans-IO state machine: it
//! consumes [`ServerEvent`]s and returns [`ServerAction`]s without performing
//! any I/O. [`Server`] wraps it with a single event-loop task, a
//! [`Dispatcher`] that owns the live connection handles, and an axum gateway
//! for WebSocket and HTTP traffic.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`RoomManager`]: Membership and word-ledger operations
//! - [`RoomRegistry`]: Room storage keyed by identifier
//! - [`Dispatcher`]: Fire-and-forget delivery to connection queues
//! - [`Server`]: Production runtime (tokio + axum)
//! - [`SystemEnv`]: Production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;
mod driver;
mod error;
mod event_loop;
mod gateway;
pub mod moderation;
mod registry;
mod room_manager;
mod server_error;
mod system_env;
pub mod topic;

use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

pub use dispatcher::{ConnectionHandle, DeliveryReport, Dispatcher};
pub use driver::{
    LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent, SessionInfo,
};
pub use error::ServerError;
pub use event_loop::{EventLoop, LoopHandle, LoopStats, Outbound, RoomView};
pub use gateway::{AppState, build_router};
use moderation::{DEFAULT_PROFANITY_URL, HttpProfanityCheck, NoScreening, ProfanityCheck};
pub use registry::{RoomError, RoomRegistry};
pub use room_manager::{RoomAction, RoomManager};
pub use server_error::{DeliveryError, ServerError as DriverError};
pub use system_env::SystemEnv;
use tokio::net::TcpListener;
use topic::{DEFAULT_TOPIC_URL, TopicSource, WikipediaTopics};

/// Settings for the outbound HTTP services.
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    /// Profanity service. Screening is disabled when `None`.
    pub profanity_url: Option<String>,
    /// MediaWiki `api.php` endpoint for topic suggestions
    pub topic_url: String,
    /// Per-request timeout for both services
    pub timeout: Duration,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            profanity_url: Some(DEFAULT_PROFANITY_URL.to_string()),
            topic_url: DEFAULT_TOPIC_URL.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3000")
    pub bind_address: String,
    /// Directory served for non-API paths
    pub static_dir: Option<PathBuf>,
    /// Per-connection outbound queue capacity
    pub send_queue: usize,
    /// Outbound HTTP services
    pub collaborators: CollaboratorConfig,
    /// Driver configuration (limits)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            static_dir: None,
            send_queue: 256,
            collaborators: CollaboratorConfig::default(),
            driver: DriverConfig::default(),
        }
    }
}

/// Production Word Pulse server.
///
/// Wraps `ServerDriver` with the event loop and the axum gateway.
pub struct Server {
    listener: TcpListener,
    event_loop: EventLoop<SystemEnv>,
    state: AppState,
    static_dir: Option<PathBuf>,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let timeout = config.collaborators.timeout;

        let profanity: Arc<dyn ProfanityCheck> = match &config.collaborators.profanity_url {
            Some(url) => {
                let check = HttpProfanityCheck::new(url.clone(), timeout)
                    .map_err(|e| ServerError::Config(format!("profanity client: {e}")))?;
                tracing::info!("Screening submitted words via {}", check.url());
                Arc::new(check)
            },
            None => Arc::new(NoScreening),
        };
        let topics: Arc<dyn TopicSource> = Arc::new(
            WikipediaTopics::new(config.collaborators.topic_url.clone(), timeout)
                .map_err(|e| ServerError::Config(format!("topic client: {e}")))?,
        );

        Self::bind_with(config, profanity, topics).await
    }

    /// Create and bind a server with explicit collaborators.
    pub async fn bind_with(
        config: ServerRuntimeConfig,
        profanity: Arc<dyn ProfanityCheck>,
        topics: Arc<dyn TopicSource>,
    ) -> Result<Self, ServerError> {
        if config.send_queue == 0 {
            return Err(ServerError::Config("send queue capacity must be positive".to_string()));
        }

        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver);
        let (event_loop, events) = EventLoop::new(driver);

        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|source| ServerError::Bind { address: config.bind_address.clone(), source })?;

        let state = AppState { events, env, profanity, topics, send_queue: config.send_queue };

        Ok(Self { listener, event_loop, state, static_dir: config.static_dir })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.local_addr()?);

        let event_loop = tokio::spawn(self.event_loop.run());
        let router = build_router(self.state, self.static_dir.as_deref());

        let served = axum::serve(self.listener, router).with_graceful_shutdown(shutdown).await;

        // Lingering connection tasks still hold loop handles
        event_loop.abort();
        served.map_err(ServerError::from)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listener", &self.listener)
            .field("static_dir", &self.static_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screening_is_on_by_default() {
        let config = CollaboratorConfig::default();
        assert_eq!(config.profanity_url.as_deref(), Some(DEFAULT_PROFANITY_URL));
        assert_eq!(config.topic_url, DEFAULT_TOPIC_URL);
    }

    #[tokio::test]
    async fn bind_builds_configured_collaborators() {
        let config = ServerRuntimeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..ServerRuntimeConfig::default()
        };

        let server = Server::bind(config).await.unwrap();

        assert!(server.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn zero_send_queue_is_rejected() {
        let config = ServerRuntimeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            send_queue: 0,
            ..ServerRuntimeConfig::default()
        };

        assert!(matches!(Server::bind(config).await, Err(ServerError::Config(_))));
    }
}
