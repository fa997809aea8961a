//! Per-identity session persistence and the cookie jar plugged into the HTTP client.

mod jar;

#[cfg(test)]
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use std::{
    fmt::{Display, Formatter},
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use self::jar::CookieJar;
use crate::prelude::*;

/// SHA-256 of the login, lower-case hex.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn of(login: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(login.as_bytes())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix that is safe to show in logs and responses.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.0[..8]
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.account())
    }
}

/// Cookie as it is kept between invocations.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,

    /// Lower-case, without the leading dot.
    pub domain: String,

    /// Only sent to the exact `domain` when set.
    #[serde(default)]
    pub host_only: bool,

    pub path: String,

    #[serde(default)]
    pub secure: bool,

    /// Absent for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if self.host_only {
            host == self.domain
        } else {
            host == self.domain
                || host.strip_suffix(&self.domain).is_some_and(|prefix| prefix.ends_with('.'))
        }
    }

    /// Exact path, or a sub-path on a segment boundary.
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        path.strip_prefix(&self.path).is_some_and(|rest| {
            rest.is_empty() || rest.starts_with('/') || self.path.ends_with('/')
        })
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Same cookie as far as replacement is concerned.
    #[must_use]
    pub fn is_same_slot(&self, other: &Self) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

/// Where the cookies of each identity survive between invocations.
pub trait SessionStore: Send + Sync {
    /// Cookies saved for the identity, empty when nothing has been saved yet.
    fn get(&self, identity: &Identity) -> Result<Vec<StoredCookie>>;

    fn put(&self, identity: &Identity, cookies: &[StoredCookie]) -> Result;
}

/// One JSON file per identity.
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, identity: &Identity) -> PathBuf {
        self.root.join(format!("{}.json", identity.as_str()))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, identity: &Identity) -> Result<Vec<StoredCookie>> {
        let path = self.path(identity);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read(&path)
            .with_context(|| format!("failed to read the session from `{}`", path.display()))?;
        serde_json::from_slice(&contents)
            .with_context(|| format!("failed to parse the session in `{}`", path.display()))
    }

    fn put(&self, identity: &Identity, cookies: &[StoredCookie]) -> Result {
        create_dir(&self.root)?;
        let path = self.path(identity);
        let contents = serde_json::to_vec_pretty(cookies)?;
        fs::write(&path, contents)
            .with_context(|| format!("failed to write the session to `{}`", path.display()))
    }
}

fn create_dir(path: &Path) -> Result {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create the session directory `{}`", path.display()))
}

#[cfg(test)]
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Identity, Vec<StoredCookie>>>,
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
    fn get(&self, identity: &Identity) -> Result<Vec<StoredCookie>> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.get(identity).cloned().unwrap_or_default())
    }

    fn put(&self, identity: &Identity, cookies: &[StoredCookie]) -> Result {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(identity.clone(), cookies.to_vec());
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn cookie(name: &str, domain: &str, host_only: bool) -> StoredCookie {
        StoredCookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: domain.to_string(),
            host_only,
            path: "/".to_string(),
            secure: false,
            expires_at: None,
        }
    }

    #[test]
    fn identity_hash_ok() {
        let identity = Identity::of("abc");
        assert_eq!(
            identity.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(identity.account(), "ba7816bf");
        assert_eq!(identity.to_string(), "ba7816bf");
    }

    #[test]
    fn domain_matching() {
        let shared = cookie("PHPSESSID", "tauron-dystrybucja.pl", false);
        assert!(shared.matches_host("elicznik.tauron-dystrybucja.pl"));
        assert!(shared.matches_host("Tauron-Dystrybucja.pl"));
        assert!(!shared.matches_host("eviltauron-dystrybucja.pl"));

        let host_only = cookie("PHPSESSID", "elicznik.tauron-dystrybucja.pl", true);
        assert!(host_only.matches_host("elicznik.tauron-dystrybucja.pl"));
        assert!(!host_only.matches_host("www.elicznik.tauron-dystrybucja.pl"));
    }

    #[test]
    fn path_matching() {
        let scoped = StoredCookie { path: "/energia".to_string(), ..cookie("a", "x", true) };
        assert!(scoped.matches_path("/energia"));
        assert!(scoped.matches_path("/energia/api"));
        assert!(!scoped.matches_path("/energiax"));
        assert!(!scoped.matches_path("/odczyty/api"));

        let directory = StoredCookie { path: "/energia/".to_string(), ..cookie("a", "x", true) };
        assert!(directory.matches_path("/energia/api"));
        assert!(!directory.matches_path("/energia"));

        let root = cookie("a", "x", true);
        assert!(root.matches_path("/"));
        assert!(root.matches_path("/energiax"));
    }

    #[test]
    fn expiry() -> Result {
        let now = DateTime::parse_from_rfc3339("2025-08-10T12:00:00Z")?.with_timezone(&Utc);
        let session = cookie("a", "x", true);
        assert!(!session.is_expired(now));

        let expires_at = Some(now);
        assert!(StoredCookie { expires_at, ..cookie("a", "x", true) }.is_expired(now));
        let expires_at = now.checked_add_signed(chrono::TimeDelta::hours(1));
        assert!(!StoredCookie { expires_at, ..cookie("a", "x", true) }.is_expired(now));
        Ok(())
    }

    #[test]
    fn expiry_survives_the_file_store() -> Result {
        let directory = tempfile::tempdir()?;
        let store = FileSessionStore::new(directory.path());
        let identity = Identity::of("jan@example.com");
        let expires_at = Some(DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")?.to_utc());
        let cookies = vec![StoredCookie { expires_at, ..cookie("a", "x", true) }];
        store.put(&identity, &cookies)?;
        assert_eq!(store.get(&identity)?, cookies);
        Ok(())
    }

    #[test]
    fn file_store_round_trip() -> Result {
        let directory = tempfile::tempdir()?;
        let store = FileSessionStore::new(directory.path().join("sessions"));
        let identity = Identity::of("jan@example.com");
        assert!(store.get(&identity)?.is_empty());

        let cookies = vec![cookie("PHPSESSID", "elicznik.tauron-dystrybucja.pl", true)];
        store.put(&identity, &cookies)?;
        assert_eq!(store.get(&identity)?, cookies);
        let path = directory.path().join("sessions").join(format!("{}.json", identity.as_str()));
        assert!(path.exists());
        assert!(store.get(&Identity::of("someone@example.com"))?.is_empty());
        Ok(())
    }

    #[test]
    fn memory_store_isolates_identities() -> Result {
        let store = MemorySessionStore::default();
        let first = Identity::of("first");
        store.put(&first, &[cookie("a", "x", true)])?;
        assert_eq!(store.get(&first)?.len(), 1);
        assert!(store.get(&Identity::of("second"))?.is_empty());
        Ok(())
    }
}
