//! Server module for running Terraform providers
//!
//! Implements the go-plugin handshake: the magic cookie is checked, a gRPC
//! server is bound to a random local port, and the handshake line is written
//! to stdout. Everything else the plugin prints must go to stderr.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// go-plugin protocol version followed by the Terraform plugin protocol version
const CORE_PROTOCOL_VERSION: u32 = 1;
const PLUGIN_PROTOCOL_VERSION: u32 = 6;

/// Log level for the provider process, read from TF_LOG
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level requested through TF_LOG, falling back to Info
    pub fn from_env() -> Self {
        std::env::var("TF_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogLevel::Info)
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = TfplugError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            // TF_LOG=JSON means trace level with JSON output in Terraform
            "TRACE" | "JSON" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(TfplugError::InvalidConfiguration(format!(
                "unknown log level: {}",
                other
            ))),
        }
    }
}

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to a PEM certificate; TLS is enabled when both paths are set
    pub cert_path: Option<PathBuf>,
    /// Path to the PEM private key for cert_path
    pub key_path: Option<PathBuf>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            max_message_size: 256 << 20, // 256MB
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.cert_path = Some(cert_path);
        self.key_path = Some(key_path);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }
}

/// Fails unless the process was launched by Terraform
pub fn check_magic_cookie(value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if v == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::HandshakeFailed(
            "this binary is a plugin and is not meant to be executed directly; \
             run Terraform instead"
                .to_string(),
        )),
    }
}

/// The line Terraform reads from stdout to find the plugin
pub fn handshake_line(addr: SocketAddr, server_cert: Option<&str>) -> String {
    let mut line = format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PLUGIN_PROTOCOL_VERSION, addr
    );
    if let Some(cert) = server_cert {
        line.push('|');
        line.push_str(cert);
    }
    line
}

/// Re-encodes the first PEM certificate as unpadded base64 DER, the form
/// go-plugin expects in the handshake
pub fn handshake_certificate(pem: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(pem)
        .map_err(|e| TfplugError::TlsError(format!("certificate is not valid PEM: {}", e)))?;

    let body: String = text
        .lines()
        .skip_while(|l| !l.starts_with("-----BEGIN CERTIFICATE-----"))
        .skip(1)
        .take_while(|l| !l.starts_with("-----END CERTIFICATE-----"))
        .map(str::trim)
        .collect();

    if body.is_empty() {
        return Err(TfplugError::TlsError(
            "no certificate found in PEM data".to_string(),
        ));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| TfplugError::TlsError(format!("invalid certificate encoding: {}", e)))?;
    Ok(STANDARD_NO_PAD.encode(der))
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie(std::env::var(MAGIC_COOKIE_KEY).ok().as_deref())?;

    // Fails only when a provider is already installed, which is fine
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let provider_service = ProviderServer::new(GrpcProviderServer::new(provider))
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    let addr = listener.local_addr()?;

    let mut builder = Server::builder();
    let mut server_cert = None;

    if let (Some(cert_path), Some(key_path)) = (&config.cert_path, &config.key_path) {
        let cert = tokio::fs::read(cert_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
        let key = tokio::fs::read(key_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

        server_cert = Some(handshake_certificate(&cert)?);

        let mut tls_config = ServerTlsConfig::new().identity(Identity::from_pem(cert, key));
        if let Ok(client_cert) = std::env::var("PLUGIN_CLIENT_CERT") {
            tls_config = tls_config.client_ca_root(Certificate::from_pem(client_cert));
        }
        builder = builder.tls_config(tls_config)?;
    }

    println!("{}", handshake_line(addr, server_cert.as_deref()));
    tracing::info!(%addr, tls = server_cert.is_some(), "provider server listening");

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    builder
        .add_service(provider_service)
        .serve_with_incoming_shutdown(incoming, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("interrupt received, shutting down");
        })
        .await?;

    Ok(())
}

/// Convenience function to run a provider with default configuration
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_terraform_values() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("JSON".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn magic_cookie_must_match() {
        assert!(check_magic_cookie(Some(MAGIC_COOKIE_VALUE)).is_ok());
        assert!(check_magic_cookie(Some("wrong")).is_err());
        assert!(check_magic_cookie(None).is_err());
    }

    #[test]
    fn handshake_line_without_tls() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 40123));
        assert_eq!(handshake_line(addr, None), "1|6|tcp|127.0.0.1:40123|grpc");
    }

    #[test]
    fn handshake_line_with_certificate() {
        let pem = b"-----BEGIN CERTIFICATE-----\nAAECAwQ=\n-----END CERTIFICATE-----\n";
        let cert = handshake_certificate(pem).unwrap();
        assert_eq!(cert, "AAECAwQ");

        let addr = SocketAddr::from(([127, 0, 0, 1], 1234));
        assert_eq!(
            handshake_line(addr, Some(&cert)),
            "1|6|tcp|127.0.0.1:1234|grpc|AAECAwQ"
        );
    }

    #[test]
    fn handshake_certificate_rejects_empty_pem() {
        assert!(handshake_certificate(b"not a certificate").is_err());
    }
}
