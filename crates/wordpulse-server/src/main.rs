//! Word Pulse server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve the browser client and the room WebSocket on port 3000
//! wordpulse-server --static-dir public
//!
//! # Skip profanity screening of submitted words
//! wordpulse-server --port 8080 --no-profanity-check
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wordpulse_server::{
    CollaboratorConfig, DriverConfig, Server, ServerRuntimeConfig,
    moderation::DEFAULT_PROFANITY_URL, topic::DEFAULT_TOPIC_URL,
};

/// Word Pulse room server
#[derive(Parser, Debug)]
#[command(name = "wordpulse-server")]
#[command(about = "Real-time word cloud rooms over WebSocket")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Directory of static assets served for non-API paths
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Outbound queue capacity per connection
    #[arg(long, default_value = "256")]
    send_queue: usize,

    /// Profanity service URL
    #[arg(long, default_value = DEFAULT_PROFANITY_URL)]
    profanity_url: String,

    /// Accept submitted words without screening them
    #[arg(long)]
    no_profanity_check: bool,

    /// MediaWiki API endpoint for topic suggestions
    #[arg(long, default_value = DEFAULT_TOPIC_URL)]
    topic_url: String,

    /// Timeout for outbound HTTP requests, in milliseconds
    #[arg(long, default_value = "5000")]
    external_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Word Pulse server starting");

    let profanity_url = (!args.no_profanity_check).then_some(args.profanity_url);
    if profanity_url.is_none() {
        tracing::info!("Profanity screening disabled");
    }

    let config = ServerRuntimeConfig {
        bind_address: format!("{}:{}", args.host, args.port),
        static_dir: args.static_dir,
        send_queue: args.send_queue,
        collaborators: CollaboratorConfig {
            profanity_url,
            topic_url: args.topic_url,
            timeout: Duration::from_millis(args.external_timeout_ms),
        },
        driver: DriverConfig { max_connections: args.max_connections },
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on http://{}", server.local_addr()?);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
