//! Cookie storage capability and an in-memory `document.cookie` emulation.
//!
//! The widget never touches cookies directly. It goes through the
//! [`CookieStorage`] trait, which a browser host implements on top of
//! `document.cookie` and which tests replace by [`DocumentCookieJar`].
//!
//! [`DocumentCookieJar`] behaves like the `document.cookie` property of a page:
//! assignments take a full cookie string (attributes included), an assignment
//! with an expiry date in the past deletes the cookie, and reading returns all
//! live cookies as `name=value` pairs joined by `"; "`.
//!
//! ## Notes & limitations
//! - Cookies are keyed by `(name, domain)`; path scoping is stored but not
//!   used for matching, since the page only ever sees its own cookies.
//! - The jar is internally synchronized and meant to be shared behind an `Arc`.

use crate::cookies::Cookie;
use anyhow::{bail, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use time::OffsetDateTime;

/// Named string storage backed by cookies.
pub trait CookieStorage: Send + Sync {
    /// Returns the value of the cookie `name`, or `None` when it is not set.
    fn get(&self, name: &str) -> Option<String>;

    /// Writes `cookie`, replacing any cookie with the same name and domain.
    fn set(&self, cookie: &Cookie) -> Result<()>;

    /// Deletes the cookie `name` by expiring it immediately.
    fn remove(&self, name: &str, domain: Option<&str>) -> Result<()>;
}

type Clock = Box<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// In-memory cookie jar with `document.cookie` semantics.
pub struct DocumentCookieJar {
    cookies: Mutex<Vec<Cookie>>,
    clock: Clock,
    disabled: AtomicBool,
}

impl Default for DocumentCookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentCookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCookieJar")
            .field("document_cookie", &self.document_cookie())
            .finish_non_exhaustive()
    }
}

impl DocumentCookieJar {
    /// Creates an empty jar that uses the system clock.
    pub fn new() -> Self {
        Self::with_clock(OffsetDateTime::now_utc)
    }

    /// Creates an empty jar that asks `clock` for the current time.
    pub fn with_clock(clock: impl Fn() -> OffsetDateTime + Send + Sync + 'static) -> Self {
        Self {
            cookies: Mutex::new(Vec::new()),
            clock: Box::new(clock),
            disabled: AtomicBool::new(false),
        }
    }

    /// Emulates a visitor that blocks cookies: every assignment fails.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    /// Assigns a raw cookie string, like `document.cookie = "..."` does.
    pub fn assign(&self, cookie_string: &str) -> Result<()> {
        if self.disabled.load(Ordering::Relaxed) {
            bail!("cookies are disabled");
        }

        let Some(cookie) = Cookie::parse(cookie_string) else {
            bail!("malformed cookie string: {cookie_string:?}");
        };

        let now = (self.clock)();
        let mut cookies = self
            .cookies
            .lock()
            .map_err(|_| anyhow::anyhow!("cookie jar lock poisoned"))?;

        let existing = cookies
            .iter()
            .position(|c| c.name == cookie.name && c.domain == cookie.domain);

        match (existing, cookie.is_expired_at(now)) {
            (Some(idx), true) => {
                cookies.remove(idx);
            }
            (Some(idx), false) => cookies[idx] = cookie,
            (None, true) => {}
            (None, false) => cookies.push(cookie),
        }

        Ok(())
    }

    /// Returns what reading `document.cookie` would: `a=1; b=2`.
    pub fn document_cookie(&self) -> String {
        let now = (self.clock)();
        let Ok(cookies) = self.cookies.lock() else {
            return String::new();
        };

        cookies
            .iter()
            .filter(|c| !c.is_expired_at(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns a copy of the live cookie `name`, attributes included.
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        let now = (self.clock)();
        self.cookies
            .lock()
            .ok()?
            .iter()
            .find(|c| c.name == name && !c.is_expired_at(now))
            .cloned()
    }
}

impl CookieStorage for DocumentCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.document_cookie()
            .split(';')
            .map(|pair| pair.trim_start_matches(' '))
            .find_map(|pair| pair.strip_prefix(prefix.as_str()))
            .map(str::to_string)
    }

    fn set(&self, cookie: &Cookie) -> Result<()> {
        self.assign(&cookie.to_string())
    }

    fn remove(&self, name: &str, domain: Option<&str>) -> Result<()> {
        self.assign(&Cookie::expired(name, domain).to_string())
    }
}
