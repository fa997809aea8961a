use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use cookie::Cookie;
use itertools::Itertools;
use reqwest::{Url, header::HeaderValue};

use crate::{
    api::session::{Identity, SessionStore, StoredCookie},
    prelude::*,
};

/// Cookie jar of one identity, written through to the session store on every change.
pub struct CookieJar {
    identity: Identity,
    store: Arc<dyn SessionStore>,
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    /// Load the persisted cookies of the identity, leaving out the expired ones.
    #[instrument(skip_all, fields(account = %identity))]
    pub fn load(identity: Identity, store: Arc<dyn SessionStore>) -> Result<Self> {
        let now = Utc::now();
        let mut cookies = store.get(&identity)?;
        cookies.retain(|cookie| !cookie.is_expired(now));
        debug!(n_cookies = cookies.len(), "loaded the session");
        Ok(Self { identity, store, cookies: RwLock::new(cookies) })
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Whether the in-memory jar holds a cookie that would be sent to the host.
    #[must_use]
    pub fn has_cookie_for(&self, host: &str) -> bool {
        let now = Utc::now();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|cookie| cookie.matches_host(host) && !cookie.is_expired(now))
    }

    /// Whether the persisted session holds a cookie that would be sent to the host.
    pub fn has_stored_cookie_for(&self, host: &str) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .store
            .get(&self.identity)?
            .iter()
            .any(|cookie| cookie.matches_host(host) && !cookie.is_expired(now)))
    }

    /// Apply one `Set-Cookie` header value received from `url`.
    ///
    /// Returns `false` when the header is ignored.
    fn apply(cookies: &mut Vec<StoredCookie>, header: &str, url: &Url, now: DateTime<Utc>) -> bool {
        let Ok(parsed) = Cookie::parse(header) else {
            warn!(header, "unparseable cookie");
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        let (domain, host_only) = match parsed.domain() {
            Some(domain) => (domain.trim_start_matches('.').to_ascii_lowercase(), false),
            None => (host.to_ascii_lowercase(), true),
        };
        let cookie = StoredCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            path: parsed.path().map_or_else(|| default_path(url), ToString::to_string),
            secure: parsed.secure().unwrap_or(false),
            domain,
            host_only,
            expires_at: expires_at(&parsed, now),
        };
        if !cookie.matches_host(host) {
            warn!(name = %cookie.name, domain = %cookie.domain, "cookie for a foreign domain");
            return false;
        }
        cookies.retain(|existing| !existing.is_same_slot(&cookie));
        if !cookie.is_expired(now) {
            cookies.push(cookie);
        }
        true
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let snapshot = {
            let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
            let now = Utc::now();
            let mut is_changed = false;
            for header in cookie_headers {
                if let Ok(header) = header.to_str() {
                    is_changed |= Self::apply(&mut cookies, header, url, now);
                }
            }
            if !is_changed {
                return;
            }
            cookies.clone()
        };
        if let Err(error) = self.store.put(&self.identity, &snapshot) {
            warn!(account = %self.identity, "failed to persist the session: {error:#}");
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let is_secure = url.scheme() == "https";
        let now = Utc::now();
        let header = self
            .cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|cookie| cookie.matches_host(host) && cookie.matches_path(url.path()))
            .filter(|cookie| (is_secure || !cookie.secure) && !cookie.is_expired(now))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .join("; ");
        if header.is_empty() { None } else { HeaderValue::from_str(&header).ok() }
    }
}

/// `Max-Age` wins over `Expires`, an unrepresentable moment means no expiry.
fn expires_at(cookie: &Cookie<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match cookie.max_age() {
        Some(max_age) => TimeDelta::try_seconds(max_age.whole_seconds())
            .and_then(|time_to_live| now.checked_add_signed(time_to_live)),
        None => cookie
            .expires_datetime()
            .and_then(|expires| DateTime::from_timestamp(expires.unix_timestamp(), 0)),
    }
}

/// Directory of the request path, as cookies without a `Path` attribute are scoped.
fn default_path(url: &Url) -> String {
    match url.path().rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => url.path()[..index].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::cookie::CookieStore;

    use super::*;
    use crate::api::session::{MemorySessionStore, tests::cookie};

    fn jar(store: &Arc<MemorySessionStore>) -> Result<CookieJar> {
        let store = Arc::clone(store) as Arc<dyn SessionStore>;
        CookieJar::load(Identity::of("jan@example.com"), store)
    }

    fn set(jar: &CookieJar, url: &str, headers: &[&'static str]) -> Result {
        let url = Url::parse(url)?;
        let headers: Vec<_> = headers.iter().copied().map(HeaderValue::from_static).collect();
        jar.set_cookies(&mut headers.iter(), &url);
        Ok(())
    }

    #[test]
    fn set_and_send_ok() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        let url = "https://elicznik.tauron-dystrybucja.pl/";
        set(&jar, url, &["PHPSESSID=abc; Path=/", "lang=pl"])?;

        let header = jar.cookies(&Url::parse(url)?.join("/energia/api")?);
        assert_eq!(header, Some(HeaderValue::from_static("PHPSESSID=abc; lang=pl")));
        assert!(jar.cookies(&Url::parse("https://logowanie.tauron-dystrybucja.pl/")?).is_none());
        assert!(jar.has_cookie_for("elicznik.tauron-dystrybucja.pl"));
        assert!(!jar.has_cookie_for("logowanie.tauron-dystrybucja.pl"));
        Ok(())
    }

    #[test]
    fn persists_on_every_write() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        set(&jar(&store)?, "https://elicznik.tauron-dystrybucja.pl/", &["PHPSESSID=abc"])?;

        let reloaded = jar(&store)?;
        assert!(reloaded.has_cookie_for("elicznik.tauron-dystrybucja.pl"));
        assert!(reloaded.has_stored_cookie_for("elicznik.tauron-dystrybucja.pl")?);
        Ok(())
    }

    #[test]
    fn overwrite_and_expire() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        let url = "https://elicznik.tauron-dystrybucja.pl/";
        set(&jar, url, &["PHPSESSID=abc; Path=/"])?;
        set(&jar, url, &["PHPSESSID=def; Path=/"])?;
        assert_eq!(
            jar.cookies(&Url::parse(url)?),
            Some(HeaderValue::from_static("PHPSESSID=def"))
        );

        set(&jar, url, &["PHPSESSID=deleted; Path=/; Max-Age=0"])?;
        assert!(jar.cookies(&Url::parse(url)?).is_none());
        assert!(store.get(&Identity::of("jan@example.com"))?.is_empty());
        Ok(())
    }

    #[test]
    fn past_expires_deletes() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        let url = "https://elicznik.tauron-dystrybucja.pl/";
        set(&jar, url, &["PHPSESSID=abc; Path=/"])?;
        set(&jar, url, &["PHPSESSID=deleted; Path=/; Expires=Thu, 01 Jan 1970 00:00:01 GMT"])?;

        assert!(jar.cookies(&Url::parse(url)?).is_none());
        assert!(!jar.has_cookie_for("elicznik.tauron-dystrybucja.pl"));
        assert!(store.get(&Identity::of("jan@example.com"))?.is_empty());
        Ok(())
    }

    #[test]
    fn future_expires_is_kept() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        let url = "https://elicznik.tauron-dystrybucja.pl/";
        set(&jar, url, &["PHPSESSID=abc; Path=/; Expires=Fri, 01 Jan 2100 00:00:00 GMT"])?;

        assert_eq!(
            jar.cookies(&Url::parse(url)?),
            Some(HeaderValue::from_static("PHPSESSID=abc"))
        );
        let stored = store.get(&Identity::of("jan@example.com"))?;
        let expected = DateTime::parse_from_rfc3339("2100-01-01T00:00:00Z")?.to_utc();
        assert_eq!(stored[0].expires_at, Some(expected));
        Ok(())
    }

    #[test]
    fn max_age_sets_expiry() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        let before = Utc::now();
        set(&jar, "https://elicznik.tauron-dystrybucja.pl/", &["PHPSESSID=abc; Max-Age=3600"])?;

        let stored = store.get(&Identity::of("jan@example.com"))?;
        let expires_at = stored[0].expires_at.context("no expiry")?;
        assert!(expires_at >= before + TimeDelta::seconds(3600));
        assert!(expires_at <= Utc::now() + TimeDelta::seconds(3600));
        Ok(())
    }

    #[test]
    fn expired_stored_cookie_is_ignored() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let stale = StoredCookie {
            expires_at: Some(Utc::now() - TimeDelta::hours(1)),
            ..cookie("PHPSESSID", "elicznik.tauron-dystrybucja.pl", true)
        };
        store.put(&Identity::of("jan@example.com"), &[stale])?;

        let jar = jar(&store)?;
        assert!(!jar.has_cookie_for("elicznik.tauron-dystrybucja.pl"));
        assert!(!jar.has_stored_cookie_for("elicznik.tauron-dystrybucja.pl")?);
        let url = Url::parse("https://elicznik.tauron-dystrybucja.pl/")?;
        assert!(jar.cookies(&url).is_none());
        Ok(())
    }

    #[test]
    fn path_scope_stops_at_segment_boundary() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        set(&jar, "https://elicznik.tauron-dystrybucja.pl/energia/api", &["a=b"])?;

        let base = Url::parse("https://elicznik.tauron-dystrybucja.pl/")?;
        assert_eq!(jar.cookies(&base.join("/energia/api")?), Some(HeaderValue::from_static("a=b")));
        assert_eq!(jar.cookies(&base.join("/energia")?), Some(HeaderValue::from_static("a=b")));
        assert!(jar.cookies(&base.join("/energiax")?).is_none());
        assert!(jar.cookies(&base).is_none());
        Ok(())
    }

    #[test]
    fn domain_cookie_is_shared_by_subdomains() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        set(
            &jar,
            "https://logowanie.tauron-dystrybucja.pl/login",
            &["SSO=xyz; Domain=.tauron-dystrybucja.pl; Path=/"],
        )?;
        assert!(jar.has_cookie_for("elicznik.tauron-dystrybucja.pl"));
        Ok(())
    }

    #[test]
    fn foreign_domain_is_rejected() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        set(&jar, "https://elicznik.tauron-dystrybucja.pl/", &["a=b; Domain=example.com"])?;
        assert!(!jar.has_cookie_for("example.com"));
        Ok(())
    }

    #[test]
    fn secure_cookie_requires_https() -> Result {
        let store = Arc::new(MemorySessionStore::default());
        let jar = jar(&store)?;
        set(&jar, "https://elicznik.tauron-dystrybucja.pl/", &["a=b; Secure"])?;
        assert!(jar.cookies(&Url::parse("http://elicznik.tauron-dystrybucja.pl/")?).is_none());
        Ok(())
    }

    #[test]
    fn default_path_ok() -> Result {
        assert_eq!(default_path(&Url::parse("https://a.pl/")?), "/");
        assert_eq!(default_path(&Url::parse("https://a.pl/login")?), "/");
        assert_eq!(default_path(&Url::parse("https://a.pl/energia/api")?), "/energia");
        Ok(())
    }
}
