//! Transport seam between the session and the immudb service
//!
//! The session only needs to open, health-check and close a connection. The
//! production [`HttpConnector`] talks to the REST API that immudb's web
//! server exposes under `/api`, so the configured port must be that
//! server's port (8080 on a stock install), not the gRPC port.

use super::options::{MtlsOptions, Options};
use crate::auth::AuthToken;
use crate::error::{ImmuclientError, Result};
use crate::utils::network::{classify_transport_error, create_client_builder, url_authority, NetworkConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, Client, ClientBuilder, Identity};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::debug;
use url::Url;

/// Health route of the REST API, relative to the server root
const HEALTH_PATH: &str = "api/health";

/// Health report returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerHealth {
    pub status: bool,
    #[serde(default)]
    pub version: String,
}

/// Opens connections to the service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection; `token` is present only in authenticated mode
    async fn connect(&self, options: &Options, token: Option<AuthToken>) -> Result<Box<dyn Connection>>;
}

/// A live connection, released on `close` or when dropped
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    fn endpoint(&self) -> String;

    async fn health(&self) -> Result<ServerHealth>;

    async fn close(&mut self) -> Result<()>;
}

pub struct HttpConnector {
    network: NetworkConfig,
}

impl HttpConnector {
    pub fn new(network: NetworkConfig) -> Self {
        Self { network }
    }

    async fn configure_mtls(
        builder: ClientBuilder,
        mtls: &MtlsOptions,
        options: &Options,
    ) -> Result<(ClientBuilder, String)> {
        let endpoint = options.endpoint();
        let mut builder = builder;

        if !mtls.certificate.as_os_str().is_empty() || !mtls.private_key.as_os_str().is_empty() {
            let mut pem = read_pem(&mtls.certificate, &endpoint).await?;
            pem.extend_from_slice(b"\n");
            pem.extend(read_pem(&mtls.private_key, &endpoint).await?);
            let identity = Identity::from_pem(&pem)
                .map_err(|e| ImmuclientError::tls(&endpoint, format!("invalid client identity: {e}")))?;
            builder = builder.identity(identity);
        }

        if !mtls.client_cas.as_os_str().is_empty() {
            let bundle = read_pem(&mtls.client_cas, &endpoint).await?;
            let certificates = Certificate::from_pem_bundle(&bundle)
                .map_err(|e| ImmuclientError::tls(&endpoint, format!("invalid CA bundle: {e}")))?;
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        if mtls.servername.is_empty() {
            return Ok((builder, options.address.clone()));
        }

        // Verify against servername while dialing the configured address
        let addr = resolve_socket_addr(options).await?;
        debug!("Using TLS server name {} for {}", mtls.servername, addr);
        Ok((builder.resolve(&mtls.servername, addr), mtls.servername.clone()))
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, options: &Options, token: Option<AuthToken>) -> Result<Box<dyn Connection>> {
        let endpoint = options.endpoint();
        let builder = create_client_builder(&self.network);

        let (mut builder, host) = match &options.mtls_options {
            Some(mtls) => Self::configure_mtls(builder, mtls, options).await?,
            None => (builder, options.address.clone()),
        };

        if let Some(token) = token {
            builder = builder.default_headers(bearer_headers(&token, &endpoint)?);
        }

        let client = builder
            .build()
            .map_err(|e| ImmuclientError::tls(&endpoint, format!("failed to build client: {e}")))?;

        let scheme = if options.mtls { "https" } else { "http" };
        let base_url = Url::parse(&format!("{scheme}://{}/", url_authority(&host, options.port)))
            .map_err(|e| ImmuclientError::invalid_value("immudb-address", e.to_string()))?;

        let connection = HttpConnection {
            client: Some(client),
            base_url,
            endpoint,
        };

        let health = connection.health().await?;
        debug!(
            "Connected to {} (healthy: {}, version: {})",
            connection.endpoint, health.status, health.version
        );

        Ok(Box::new(connection))
    }
}

pub struct HttpConnection {
    client: Option<Client>,
    base_url: Url,
    endpoint: String,
}

#[async_trait]
impl Connection for HttpConnection {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn health(&self) -> Result<ServerHealth> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ImmuclientError::connection(&self.endpoint, "connection is closed"))?;

        let url = self
            .base_url
            .join(HEALTH_PATH)
            .map_err(|e| ImmuclientError::connection(&self.endpoint, e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, &self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImmuclientError::malformed_response(
                &self.endpoint,
                format!("unexpected HTTP status {status}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e, &self.endpoint))?;

        serde_json::from_str::<ServerHealth>(&body)
            .map_err(|e| ImmuclientError::malformed_response(&self.endpoint, e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        match self.client.take() {
            Some(client) => {
                drop(client);
                debug!("Released connection to {}", self.endpoint);
                Ok(())
            }
            None => Err(ImmuclientError::disconnect(format!(
                "connection to {} is already closed",
                self.endpoint
            ))),
        }
    }
}

fn bearer_headers(token: &AuthToken, endpoint: &str) -> Result<HeaderMap> {
    let mut raw = b"Bearer ".to_vec();
    raw.extend_from_slice(token.secret().trim_ascii());
    let mut value = HeaderValue::from_bytes(&raw)
        .map_err(|_| ImmuclientError::connection(endpoint, "token file contains invalid header characters"))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

async fn read_pem(path: &std::path::Path, endpoint: &str) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ImmuclientError::tls(endpoint, format!("cannot read {}: {e}", path.display())))
}

async fn resolve_socket_addr(options: &Options) -> Result<SocketAddr> {
    let endpoint = options.endpoint();
    tokio::net::lookup_host((options.address.as_str(), options.port))
        .await
        .map_err(|e| ImmuclientError::connection(&endpoint, format!("unable to resolve address: {e}")))?
        .next()
        .ok_or_else(|| ImmuclientError::connection(&endpoint, "address resolved to nothing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn plain_options(port: u16) -> Options {
        Options {
            port,
            address: "127.0.0.1".to_string(),
            token_file_name: "token".to_string(),
            mtls: false,
            auth: false,
            mtls_options: None,
        }
    }

    #[test]
    fn test_health_body_parses() {
        let health: ServerHealth =
            serde_json::from_str(r#"{"status": true, "version": "1.9.0"}"#).unwrap();
        assert!(health.status);
        assert_eq!(health.version, "1.9.0");

        let health: ServerHealth = serde_json::from_str(r#"{"status": false}"#).unwrap();
        assert!(health.version.is_empty());
    }

    #[test]
    fn test_bearer_header_is_sensitive() {
        let token = AuthToken::new("abc123\n");
        let headers = bearer_headers(&token, "127.0.0.1:3322").unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();

        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Bearer abc123");
    }

    #[test]
    fn test_non_utf8_token_still_builds_header() {
        let token = AuthToken::new(vec![0xff, 0xfe, b'A', b'B']);
        let headers = bearer_headers(&token, "127.0.0.1:8080").unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();

        assert_eq!(value.as_bytes(), b"Bearer \xff\xfeAB");
    }

    #[test]
    fn test_control_characters_in_token_are_rejected() {
        let token = AuthToken::new("abc\x00def");
        let err = bearer_headers(&token, "127.0.0.1:8080").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Connection);
    }

    /// Serve one canned health response and report the request line received
    async fn serve_health_once(listener: TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let mut read = 0;
        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf[read..]).await.unwrap();
            if n == 0 {
                break;
            }
            read += n;
        }

        let body = r#"{"status":true,"version":"1.9.5"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();

        let request = String::from_utf8_lossy(&buf[..read]).to_string();
        request.lines().next().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_connect_requests_api_health_route() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_health_once(listener));

        let connector = HttpConnector::new(NetworkConfig {
            use_system_proxy: false,
            ..NetworkConfig::default()
        });
        let mut connection = connector
            .connect(&plain_options(port), None)
            .await
            .unwrap();

        assert_eq!(server.await.unwrap(), "GET /api/health HTTP/1.1");
        assert_eq!(connection.endpoint(), format!("127.0.0.1:{port}"));
        connection.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_connection_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = HttpConnector::default();
        let result = connector.connect(&plain_options(port), None).await;

        match result {
            Err(err) => assert_eq!(err.kind(), crate::error::ErrorKind::Connection),
            Ok(_) => panic!("connecting to a closed port should fail"),
        }
    }

    #[tokio::test]
    async fn test_missing_certificate_is_tls_error() {
        let mut options = plain_options(3322);
        options.mtls = true;
        options.mtls_options = Some(MtlsOptions {
            servername: String::new(),
            certificate: PathBuf::from("/nonexistent/cert.pem"),
            private_key: PathBuf::from("/nonexistent/key.pem"),
            client_cas: PathBuf::new(),
        });

        let result = HttpConnector::default().connect(&options, None).await;
        assert!(matches!(result, Err(ImmuclientError::TlsError { .. })));
    }

    #[tokio::test]
    async fn test_close_twice_fails() {
        let mut connection = HttpConnection {
            client: Some(Client::new()),
            base_url: Url::parse("http://127.0.0.1:3322/").unwrap(),
            endpoint: "127.0.0.1:3322".to_string(),
        };

        connection.close().await.unwrap();
        let err = connection.close().await.unwrap_err();
        assert!(matches!(err, ImmuclientError::DisconnectError(_)));
        assert!(connection.health().await.is_err());
    }
}
