//! Stored authentication token
//!
//! A previous login leaves a token file behind. Its presence with non-empty
//! content is the only signal used to start an authenticated session; the
//! token itself is not validated here.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Token read from the token file, wiped from memory on drop
#[derive(Clone)]
pub struct AuthToken(Zeroizing<Vec<u8>>);

impl AuthToken {
    pub fn new(token: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Raw file content; no encoding is assumed
    pub fn secret(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Resolve the token file name against the user's home directory, falling
/// back to the executable's directory. Absolute names are used as-is.
pub fn resolve_token_path(file_name: &str) -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    resolve_token_path_in(file_name, dirs::home_dir().as_deref(), exe_dir.as_deref())
}

pub fn resolve_token_path_in(file_name: &str, home: Option<&Path>, exe_dir: Option<&Path>) -> PathBuf {
    let name = Path::new(file_name);
    if name.is_absolute() {
        return name.to_path_buf();
    }

    match home.or(exe_dir) {
        Some(base) => base.join(name),
        None => name.to_path_buf(),
    }
}

/// Read the token file, treating every failure as "no prior token".
///
/// Missing files, permission errors and empty files all yield `None`.
/// Any non-empty content counts, whatever its encoding.
pub async fn read_token(path: &Path) -> Option<AuthToken> {
    match tokio::fs::read(path).await.map(Zeroizing::new) {
        Ok(content) if !content.is_empty() => {
            debug!("Found token file at {}", path.display());
            Some(AuthToken(content))
        }
        Ok(_) => {
            debug!("Token file {} is empty", path.display());
            None
        }
        Err(e) => {
            debug!("No usable token file at {}: {}", path.display(), e);
            None
        }
    }
}
