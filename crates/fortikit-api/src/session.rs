// Session persistence
//
// One file per host under a configured directory, holding the opaque
// session token. Missing or unreadable files mean "not logged in"; they are
// never an error. Writes go through a temporary file that is renamed over
// the record, so a reader never sees a partially written token.

use std::fmt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::Error;

/// Opaque credential issued at login (session key or cookie header).
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for placing into requests or onto disk.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl From<&SecretString> for SessionToken {
    fn from(secret: &SecretString) -> Self {
        Self(secret.clone())
    }
}

/// Filesystem-backed store of session tokens, partitioned by host.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    suffix: &'static str,
}

impl SessionStore {
    /// Create a store rooted at `dir`. Records are named `<host>.<suffix>`.
    ///
    /// The directory does not need to exist yet; it is created on first save.
    /// A path that exists but is not a directory is rejected.
    pub fn new(dir: impl Into<PathBuf>, suffix: &'static str) -> Result<Self, Error> {
        let dir = dir.into();
        if dir.exists() && !dir.is_dir() {
            return Err(Error::Configuration(format!(
                "session path {} is not a directory",
                dir.display()
            )));
        }
        Ok(Self { dir, suffix })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The record path for `host`.
    pub fn path_for(&self, host: &str) -> Result<PathBuf, Error> {
        let valid = !host.is_empty()
            && Path::new(host)
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            && !host.contains(['/', '\\']);
        if !valid {
            return Err(Error::Configuration(format!(
                "invalid host name for session record: '{host}'"
            )));
        }
        Ok(self.dir.join(format!("{host}.{}", self.suffix)))
    }

    /// Load the token for `host`, or `None` if there is no usable record.
    pub fn load(&self, host: &str) -> Option<SessionToken> {
        let path = match self.path_for(host) {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "ignoring session record");
                return None;
            }
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    debug!(path = %path.display(), "session record is empty");
                    None
                } else {
                    debug!(path = %path.display(), "loaded session record");
                    Some(SessionToken::new(token))
                }
            }
            Err(err) => {
                debug!(path = %path.display(), %err, "no usable session record");
                None
            }
        }
    }

    /// Persist `token` for `host`, replacing any previous record atomically.
    pub fn save(&self, host: &str, token: &SessionToken) -> Result<(), Error> {
        let path = self.path_for(host)?;
        let io_err = |e: std::io::Error| {
            Error::Configuration(format!(
                "cannot write session record {}: {e}",
                path.display()
            ))
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(token.expose().as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(path = %path.display(), "saved session record");
        Ok(())
    }

    /// Delete the record for `host`. A missing record is not an error.
    pub fn remove(&self, host: &str) -> Result<(), Error> {
        let path = self.path_for(host)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed session record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Configuration(format!(
                "cannot remove session record {}: {e}",
                path.display()
            ))),
        }
    }
}
