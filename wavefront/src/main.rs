use std::path::PathBuf;
use tfplug::{LogLevel, ServerConfig};
use wavefront::WavefrontProvider;

/// PEM certificate and key for serving the plugin over TLS
const TLS_CERT_ENV: &str = "WAVEFRONT_PLUGIN_TLS_CERT";
const TLS_KEY_ENV: &str = "WAVEFRONT_PLUGIN_TLS_KEY";

fn server_config() -> ServerConfig {
    let config = ServerConfig::new();
    match (std::env::var(TLS_CERT_ENV), std::env::var(TLS_KEY_ENV)) {
        (Ok(cert), Ok(key)) => config.with_tls(PathBuf::from(cert), PathBuf::from(key)),
        _ => config,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_max_level(LogLevel::from_env().as_tracing_level())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tfplug::serve(WavefrontProvider::new(), server_config()).await?;

    Ok(())
}
