use crate::error::ImmuclientError;
use reqwest::ClientBuilder;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Honor HTTP(S)_PROXY from the environment
    pub use_system_proxy: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("immuclient/{}", env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
        }
    }
}

/// Start a client builder with timeouts and rustls applied
pub fn create_client_builder(config: &NetworkConfig) -> ClientBuilder {
    let builder = reqwest::Client::builder()
        .use_rustls_tls()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent);

    if config.use_system_proxy {
        builder
    } else {
        builder.no_proxy()
    }
}

/// Format `host:port`, bracketing IPv6 literals for use in URLs
pub fn url_authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Map a transport error onto a user-facing connection error
pub fn classify_transport_error(error: &reqwest::Error, endpoint: &str) -> ImmuclientError {
    if error.is_timeout() {
        return ImmuclientError::connection_timeout(
            endpoint,
            "the server did not answer in time; check that immudb is running and reachable",
        );
    }

    let message = error_chain(error).to_lowercase();

    if is_tls_error(&message) {
        return ImmuclientError::tls(endpoint, error_chain(error));
    }

    if error.is_connect() {
        if is_dns_resolution_error(&message) {
            return ImmuclientError::connection(
                endpoint,
                "unable to resolve the server address; check --immudb-address",
            );
        }

        if message.contains("connection refused") {
            return ImmuclientError::connection_refused(endpoint);
        }

        return ImmuclientError::connection(endpoint, error_chain(error));
    }

    if error.is_decode() || error.is_body() {
        return ImmuclientError::malformed_response(endpoint, error_chain(error));
    }

    ImmuclientError::connection(endpoint, error_chain(error))
}

// reqwest hides the interesting part (refused, cert expired, ...) in sources
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn is_tls_error(message: &str) -> bool {
    ["tls", "ssl", "certificate", "handshake"]
        .iter()
        .any(|indicator| message.contains(indicator))
}

fn is_dns_resolution_error(message: &str) -> bool {
    let dns_indicators = [
        "dns",
        "name resolution",
        "failed to lookup address",
        "name or service not known",
        "nodename nor servname provided",
        "temporary failure in name resolution",
        "no such host",
        "host not found",
        "getaddrinfo failed",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| message.contains(indicator))
}
