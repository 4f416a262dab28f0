//! The consent cookie value type.
//!
//! A [`Cookie`] renders to, and parses from, the string a page assigns to
//! `document.cookie`:
//!
//! ```text
//! name=value; Path=/; SameSite=Strict[; Domain=<d>][; Expires=<RFC 1123 date>]
//! ```
//!
//! ```rust
//! use cookie_consent::cookies::Cookie;
//! use time::macros::datetime;
//!
//! let c = Cookie::consent("cc", "true", None, datetime!(2024-03-01 12:00:00 UTC));
//! assert_eq!(c.to_string(), "cc=true; Path=/; SameSite=Strict; Expires=Sat, 01 Mar 2025 12:00:00 GMT");
//! ```

use std::fmt::{self, Display};
use time::format_description::BorrowedFormatItem;
use time::macros::{datetime, format_description};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// How long a consent decision is kept.
pub const CONSENT_LIFETIME_DAYS: i64 = 365;

const HTTP_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

/// Formats `at` as an RFC 1123 date (`Thu, 01 Jan 1970 00:00:01 GMT`).
pub fn format_http_date(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    // Formatting into a String only fails for components the description does not use.
    utc.format(HTTP_DATE).unwrap_or_default()
}

/// Parses an RFC 1123 date as written by [`format_http_date`].
pub fn parse_http_date(s: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(s.trim(), HTTP_DATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// SameSite policy of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("strict") {
            Some(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Some(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Some(SameSite::None)
        } else {
            None
        }
    }
}

impl Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// A cookie as assigned through `document.cookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,
    /// Raw cookie value.
    pub value: String,
    /// Path scoping. The consent cookie always uses `/`.
    pub path: Option<String>,
    /// Domain scoping, host-only if `None`.
    pub domain: Option<String>,
    pub same_site: Option<SameSite>,
    /// Expiration time. Session cookies have `None`.
    pub expires: Option<OffsetDateTime>,
}

impl Cookie {
    /// The consent cookie: path `/`, `SameSite=Strict`, valid for
    /// [`CONSENT_LIFETIME_DAYS`] days from `now`.
    pub fn consent(name: &str, value: &str, domain: Option<&str>, now: OffsetDateTime) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: Some("/".into()),
            domain: domain.filter(|d| !d.is_empty()).map(str::to_string),
            same_site: Some(SameSite::Strict),
            expires: Some(now + Duration::days(CONSENT_LIFETIME_DAYS)),
        }
    }

    /// An empty cookie that expired long ago. Assigning it deletes `name`.
    pub fn expired(name: &str, domain: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            path: Some("/".into()),
            domain: domain.filter(|d| !d.is_empty()).map(str::to_string),
            same_site: Some(SameSite::Strict),
            expires: Some(datetime!(1970-01-01 0:00:01 UTC)),
        }
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Parses a `document.cookie` assignment.
    ///
    /// Unknown attributes are skipped. Returns `None` when there is no `name=` pair.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            path: None,
            domain: None,
            same_site: None,
            expires: None,
        };

        for part in parts {
            let Some((k, v)) = part.trim().split_once('=') else {
                continue;
            };
            match k.trim().to_ascii_lowercase().as_str() {
                "path" => cookie.path = Some(v.trim().to_string()),
                "domain" => cookie.domain = Some(v.trim().trim_start_matches('.').to_string()),
                "expires" => cookie.expires = parse_http_date(v),
                "samesite" => cookie.same_site = SameSite::parse(v),
                _ => {}
            }
        }

        Some(cookie)
    }
}

impl Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(same_site) = &self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", format_http_date(expires))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_cookie_format_with_domain() {
        let c = Cookie::consent("cc", "false", Some("example.com"), datetime!(2024-01-01 0:00 UTC));
        assert_eq!(
            c.to_string(),
            "cc=false; Path=/; SameSite=Strict; Domain=example.com; Expires=Tue, 31 Dec 2024 00:00:00 GMT"
        );
    }

    #[test]
    fn empty_domain_is_host_only() {
        let c = Cookie::consent("cc", "true", Some(""), datetime!(2024-01-01 0:00 UTC));
        assert_eq!(c.domain, None);
    }

    #[test]
    fn expired_cookie_uses_the_epoch() {
        let c = Cookie::expired("cc", None);
        assert_eq!(c.to_string(), "cc=; Path=/; SameSite=Strict; Expires=Thu, 01 Jan 1970 00:00:01 GMT");
        assert!(c.is_expired_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn parse_reads_back_what_display_writes() {
        let written = Cookie::consent("cookie-consent-tracking-allowed", "true", Some("a.test"), datetime!(2030-06-15 8:30:05 UTC));
        let parsed = Cookie::parse(&written.to_string()).unwrap();
        assert_eq!(parsed, written);
    }

    #[test]
    fn parse_is_lenient_about_case_and_trailing_separators() {
        let c = Cookie::parse("x=1; path=/sub; samesite=lax; domain=.site.test; secure;").unwrap();
        assert_eq!(c.value, "1");
        assert_eq!(c.path.as_deref(), Some("/sub"));
        assert_eq!(c.same_site, Some(SameSite::Lax));
        assert_eq!(c.domain.as_deref(), Some("site.test"));
        assert_eq!(c.expires, None);

        assert!(Cookie::parse("novalue").is_none());
        assert!(Cookie::parse("=orphan").is_none());
    }
}
