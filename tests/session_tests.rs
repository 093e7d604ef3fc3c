//! Session lifecycle tests
//!
//! Tests for authentication mode detection from the token file, connect and
//! disconnect outcomes, and the guarantee that setup failures never reach
//! the connector.

use async_trait::async_trait;
use clap::Parser;
use immuclient::auth::AuthToken;
use immuclient::cli::Cli;
use immuclient::client::{Connection, Connector, Options, ServerHealth, SessionManager, SessionState};
use immuclient::config::{ConfigResolver, ConfigValue, ResolvedConfig};
use immuclient::{ErrorKind, ImmuclientError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records every connect call and hands out in-memory connections
#[derive(Default)]
struct FakeConnector {
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
    last_auth: Mutex<Option<bool>>,
    last_token: Mutex<Option<Vec<u8>>>,
    refuse: bool,
    fail_close: bool,
}

struct FakeConnection {
    endpoint: String,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, options: &Options, token: Option<AuthToken>) -> Result<Box<dyn Connection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_auth.lock().unwrap() = Some(options.auth);
        *self.last_token.lock().unwrap() = token.map(|t| t.secret().to_vec());

        if self.refuse {
            return Err(ImmuclientError::connection_refused(options.endpoint()));
        }

        Ok(Box::new(FakeConnection {
            endpoint: options.endpoint(),
            closes: self.closes.clone(),
            fail_close: self.fail_close,
        }))
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn health(&self) -> Result<ServerHealth> {
        Ok(ServerHealth {
            status: true,
            version: "test".to_string(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        if self.fail_close {
            return Err(ImmuclientError::disconnect("close failed"));
        }
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Configuration whose token file is an absolute path inside `dir`
fn config_with_token(dir: &Path, extra: &[(&str, ConfigValue)]) -> ResolvedConfig {
    let mut resolver = ConfigResolver::with_defaults().unwrap();
    let token_path = dir.join("token");
    resolver
        .bind_flag(
            "tokenfile",
            ConfigValue::Str(token_path.to_string_lossy().to_string()),
        )
        .unwrap();
    for (name, value) in extra {
        resolver.bind_flag(name, value.clone()).unwrap();
    }
    resolver.resolve()
}

#[cfg(test)]
mod token_state_tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_token_file_means_no_auth() {
        let temp_dir = TempDir::new().unwrap();
        let connector = Arc::new(FakeConnector::default());
        let mut manager =
            SessionManager::new(config_with_token(temp_dir.path(), &[]), connector.clone());

        let session = manager.connect().await.unwrap();

        assert!(!session.auth());
        assert!(session.options().mtls_options.is_none());
        assert_eq!(session.options().port, 8080);
        assert_eq!(*connector.last_auth.lock().unwrap(), Some(false));
        assert!(connector.last_token.lock().unwrap().is_none());
        manager.disconnect(session).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_token_file_means_no_auth() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("token"), "").unwrap();
        let connector = Arc::new(FakeConnector::default());
        let mut manager = SessionManager::new(
            config_with_token(temp_dir.path(), &[("mtls", ConfigValue::Bool(true))]),
            connector.clone(),
        );

        let session = manager.connect().await.unwrap();

        assert!(!session.auth());
        manager.disconnect(session).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_empty_token_file_means_auth() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("token"), "abc123").unwrap();
        let connector = Arc::new(FakeConnector::default());
        let mut manager = SessionManager::new(
            config_with_token(
                temp_dir.path(),
                &[
                    ("mtls", ConfigValue::Bool(true)),
                    ("servername", ConfigValue::Str("node1".to_string())),
                ],
            ),
            connector.clone(),
        );

        let session = manager.connect().await.unwrap();

        assert!(session.auth());
        assert_eq!(
            session.options().mtls_options.as_ref().unwrap().servername,
            "node1"
        );
        assert_eq!(
            connector.last_token.lock().unwrap().as_deref(),
            Some(b"abc123".as_slice())
        );
        manager.disconnect(session).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_utf8_token_file_means_auth() {
        let temp_dir = TempDir::new().unwrap();
        let raw: [u8; 4] = [0xff, 0xfe, 0x41, 0x42];
        std::fs::write(temp_dir.path().join("token"), raw).unwrap();
        let connector = Arc::new(FakeConnector::default());
        let mut manager =
            SessionManager::new(config_with_token(temp_dir.path(), &[]), connector.clone());

        let session = manager.connect().await.unwrap();

        assert!(session.auth());
        assert_eq!(
            connector.last_token.lock().unwrap().as_deref(),
            Some(&raw[..])
        );
        manager.disconnect(session).await.unwrap();
    }

    #[tokio::test]
    async fn test_token_path_that_is_a_directory_means_no_auth() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("token")).unwrap();
        let connector = Arc::new(FakeConnector::default());
        let mut manager =
            SessionManager::new(config_with_token(temp_dir.path(), &[]), connector.clone());

        let session = manager.connect().await.unwrap();
        assert!(!session.auth());
        manager.disconnect(session).await.unwrap();
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_then_disconnect_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let connector = Arc::new(FakeConnector::default());
        let mut manager =
            SessionManager::new(config_with_token(temp_dir.path(), &[]), connector.clone());

        assert_eq!(manager.state(), SessionState::Uninitialized);
        let session = manager.connect().await.unwrap();
        assert_eq!(manager.state(), SessionState::Connected);

        manager.disconnect(session).await.unwrap();
        assert_eq!(manager.state(), SessionState::Closed);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        let temp_dir = TempDir::new().unwrap();
        let connector = Arc::new(FakeConnector {
            refuse: true,
            ..Default::default()
        });
        let mut manager =
            SessionManager::new(config_with_token(temp_dir.path(), &[]), connector.clone());

        let err = manager.connect().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_ne!(err.exit_code(), 0);
        assert_eq!(manager.state(), SessionState::Closed);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_close_is_disconnect_error() {
        let temp_dir = TempDir::new().unwrap();
        let connector = Arc::new(FakeConnector {
            fail_close: true,
            ..Default::default()
        });
        let mut manager =
            SessionManager::new(config_with_token(temp_dir.path(), &[]), connector.clone());

        let session = manager.connect().await.unwrap();
        let err = manager.disconnect(session).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Disconnect);
    }

    #[tokio::test]
    async fn test_status_command_runs_full_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let token_path = temp_dir.path().join("token");
        let cli = Cli::try_parse_from([
            "immuclient",
            "--tokenfile",
            token_path.to_str().unwrap(),
            "status",
        ])
        .unwrap();
        let connector = Arc::new(FakeConnector::default());

        cli.run(Vec::new(), &[], connector.clone()).await.unwrap();

        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_setup_failure_prevents_connect() {
        let cli = Cli::try_parse_from(["immuclient", "status"]).unwrap();
        let connector = Arc::new(FakeConnector::default());

        let err = cli
            .run(
                vec![(
                    "IMMUCLIENT_IMMUDB_PORT".to_string(),
                    "not-a-port".to_string(),
                )],
                &[],
                connector.clone(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Setup);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }
}
