//! Cookies: the [`Cookie`] value type, the [`CookieStorage`] capability and
//! the in-memory [`DocumentCookieJar`].

mod cookie;
mod jar;

pub use cookie::{format_http_date, parse_http_date, Cookie, SameSite, CONSENT_LIFETIME_DAYS};
pub use jar::{CookieStorage, DocumentCookieJar};
