use anyhow::Result;
use clap::{Parser, Subcommand};
use dhmac_auth::{
    KeyId, ServiceConfig, auth::format_credentials, auth::sign_request, create_authenticator,
    load_service_config, resolve_config_path,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Log directives used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_DIRECTIVES: &str = "dhmac_auth=info,tower_http=warn";

#[derive(Parser)]
#[command(name = "dhmac-auth")]
#[command(about = "Distributed-HMAC request authentication")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the authenticated HTTP API
    Serve {
        /// Path to dhmac.json (defaults to $DHMAC_CONFIG or ./dhmac.json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Bind address, overrides the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the Authorization header value for a request
    Sign {
        #[arg(long)]
        key_id: u64,
        /// Key secret
        #[arg(long, env = "DHMAC_SECRET", hide_env_values = true)]
        secret: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request URI exactly as the server will see it, e.g. /whoami
        #[arg(long)]
        uri: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    log_subscriber(log_filter()).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let path = match config {
                Some(path) => Ok(path),
                None => resolve_config_path(),
            };
            let service_config = match path {
                Ok(path) => {
                    info!("Loading configuration from {}", path.display());
                    load_service_config(&path)?
                }
                Err(e) => {
                    warn!("{}; starting with defaults and no keys", e);
                    ServiceConfig::default()
                }
            };
            let bind = bind.unwrap_or_else(|| service_config.bind.clone());

            let (authenticator, store) = create_authenticator(&service_config);
            info!(
                "Realm '{}', minimum security level {}, refresh on use: {}, {} keys loaded",
                authenticator.realm(),
                authenticator.min_security_level(),
                authenticator.refresh_on_valid_use(),
                store.len().await
            );

            let app = dhmac_auth::api::create_router(authenticator);
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Listening on http://{}", bind);

            axum::serve(listener, app).await?;
        }
        Commands::Sign {
            key_id,
            secret,
            method,
            uri,
        } => {
            let method = method.to_ascii_uppercase();
            let signature = sign_request(secret.as_bytes(), &method, &uri);
            println!("{}", format_credentials(KeyId::new(key_id), &signature));
        }
    }

    Ok(())
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

fn log_subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt().with_env_filter(filter).finish()
}
