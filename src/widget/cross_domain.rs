//! Cross-domain consent propagation.
//!
//! A decision made on one site is carried to trusted sibling sites through a
//! query parameter (`_cc` by default) appended to outbound links. On arrival,
//! the receiving widget applies the decision, skips the modal and removes the
//! parameter from the visible URL.

use super::ConsentWidget;
use crate::bot::is_bot;
use crate::config::RescanPolicy;
use crate::page::LinkId;
use std::time::Duration;
use url::{form_urlencoded, Url};

impl ConsentWidget {
    /// Enables cross-domain propagation towards `domains`.
    ///
    /// Runs once the document is ready: a decision in the page URL is applied,
    /// and outbound links are wired according to the rescan policy. Calling it
    /// again replaces the trusted domains and rescans the links.
    pub fn enable_cross_domain<I, S>(&mut self, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cross_domain.domains = domains.into_iter().map(Into::into).collect();
        self.cross_domain.enabled = true;
        log::debug!("consent: cross-domain enabled for {:?}", self.cross_domain.domains);

        if !self.services.page.ready_state().is_ready() {
            return;
        }

        if self.cross_domain.initialized {
            self.scan_links();
        } else {
            self.init_cross_domain();
        }
    }

    pub(super) fn init_cross_domain(&mut self) {
        self.cross_domain.initialized = true;

        self.consume_query_parameter();
        self.scan_links();

        match self.resolved.config().rescan_policy {
            RescanPolicy::Once => {}
            RescanPolicy::OnDocumentChange => {
                if !self.cross_domain.listening_for_changes {
                    self.cross_domain.listening_for_changes = true;
                    self.services.page.listen_for_document_changes();
                }
            }
            RescanPolicy::Every(ms) => {
                if self.cross_domain.rescan_timer.is_none() {
                    let timer = self.services.page.set_interval(Duration::from_millis(ms));
                    self.cross_domain.rescan_timer = Some(timer);
                }
            }
        }
    }

    fn consume_query_parameter(&mut self) {
        let location = self.services.page.location();
        let name = self.resolved.config().cross_domain_query_parameter_name.clone();

        let Some(value) = query_param(&location, &name).filter(|v| !v.is_empty()) else {
            return;
        };

        let applied = match value.as_str() {
            super::ACCEPTED => Some(self.accept()),
            super::DECLINED => Some(self.decline()),
            _ => None,
        };
        if let Some(result) = applied {
            self.show_on_load = false;
            log::info!("consent: decision '{}' carried over from another domain", value);
            if let Err(e) = result {
                log::warn!("consent: {}", e);
            }
        }

        let cleaned = strip_query_param(&location, &name);
        if cleaned != location {
            if let Err(e) = self.services.page.replace_location(&cleaned) {
                log::debug!("consent: cannot remove '{}' from the URL: {}", name, e);
            }
        }
    }

    /// Wires every link that was not wired yet. Does nothing for crawlers.
    pub(super) fn scan_links(&mut self) {
        let page = self.services.page.clone();
        if is_bot(&page.user_agent()) {
            log::debug!("consent: crawler detected, links are left untouched");
            return;
        }

        let location = page.location();
        for link in page.links().into_iter().filter(|l| !l.processed) {
            page.mark_link_processed(link.id);

            let external = location
                .join(&link.href)
                .map(|target| !same_host(&target, &location))
                .unwrap_or(false);
            if external {
                page.listen_for_link_clicks(link.id);
            }
        }
    }

    pub(super) fn on_document_changed(&mut self) {
        if self.cross_domain.enabled
            && self.resolved.config().rescan_policy == RescanPolicy::OnDocumentChange
        {
            self.scan_links();
        }
    }

    pub(super) fn on_link_clicked(&mut self, link: LinkId) {
        let Some(state) = self.cookie_value().filter(|v| !v.is_empty()) else {
            return;
        };

        let page = &self.services.page;
        let Some(href) = page.link_href(link) else {
            return;
        };
        let location = page.location();
        let Ok(target) = location.join(&href) else {
            return;
        };

        if !is_trusted_target(&target, &location, &self.cross_domain.domains) {
            return;
        }

        let name = &self.resolved.config().cross_domain_query_parameter_name;
        let rewritten = append_consent_param(&target, name, &state);
        log::debug!("consent: link {} rewritten to {}", link, rewritten);
        page.set_link_href(link, &rewritten);
    }
}

fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain
        .trim()
        .trim_end_matches('/')
        .trim_start_matches('.')
        .to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// True when `target` is on another host than `current` and that host is one
/// of `domains` or a subdomain of one.
pub fn is_trusted_target(target: &Url, current: &Url, domains: &[String]) -> bool {
    let Some(host) = target.host_str() else {
        return false;
    };
    if same_host(target, current) {
        return false;
    }
    domains.iter().any(|d| host_matches(host, d))
}

/// Appends `name=value` to the query of `target`.
pub fn append_consent_param(target: &Url, name: &str, value: &str) -> String {
    let mut url = target.clone();
    url.query_pairs_mut().append_pair(name, value);
    url.to_string()
}

/// The decoded value of the first query parameter called `name`.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// `url` without any query parameter called `name`.
///
/// Only the matching `key=value` segments are removed; the remaining segments
/// are kept byte for byte.
pub fn strip_query_param(url: &Url, name: &str) -> Url {
    let Some(query) = url.query() else {
        return url.clone();
    };

    let segments: Vec<&str> = query.split('&').collect();
    let kept: Vec<&str> = segments
        .iter()
        .copied()
        .filter(|segment| !segment_has_key(segment, name))
        .collect();
    if kept.len() == segments.len() {
        return url.clone();
    }

    let mut cleaned = url.clone();
    if kept.iter().all(|segment| segment.is_empty()) {
        cleaned.set_query(None);
    } else {
        cleaned.set_query(Some(&kept.join("&")));
    }
    cleaned
}

fn segment_has_key(segment: &str, name: &str) -> bool {
    let raw_key = segment.split('=').next().unwrap_or_default();
    form_urlencoded::parse(raw_key.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn trusted_hosts_and_subdomains() {
        let current = u("https://shop.a.test/");
        let domains = vec!["b.test".to_string(), "c.test/".to_string()];

        assert!(is_trusted_target(&u("https://b.test/x"), &current, &domains));
        assert!(is_trusted_target(&u("https://www.B.test/x"), &current, &domains));
        assert!(is_trusted_target(&u("http://c.test"), &current, &domains));
        assert!(!is_trusted_target(&u("https://notb.test/"), &current, &domains));
        assert!(!is_trusted_target(&u("https://d.test/"), &current, &domains));
        assert!(!is_trusted_target(&u("mailto:someone@b.test"), &current, &domains));
    }

    #[test]
    fn same_host_is_never_a_target() {
        let current = u("https://b.test/page");
        let domains = vec!["b.test".to_string()];
        assert!(!is_trusted_target(&u("https://b.test/other"), &current, &domains));
        // another port is another site
        assert!(is_trusted_target(&u("https://b.test:8443/other"), &current, &domains));
    }

    #[test]
    fn param_is_appended_with_the_right_separator() {
        assert_eq!(append_consent_param(&u("https://b.test/x"), "_cc", "true"), "https://b.test/x?_cc=true");
        assert_eq!(
            append_consent_param(&u("https://b.test/x?a=1"), "_cc", "false"),
            "https://b.test/x?a=1&_cc=false"
        );
        assert_eq!(
            append_consent_param(&u("https://b.test/x#top"), "_cc", "true"),
            "https://b.test/x?_cc=true#top"
        );
    }

    #[test]
    fn query_param_is_decoded() {
        assert_eq!(query_param(&u("https://a.test/?_cc=true&x=1"), "_cc").as_deref(), Some("true"));
        assert_eq!(query_param(&u("https://a.test/?x=a+b%21"), "x").as_deref(), Some("a b!"));
        assert_eq!(query_param(&u("https://a.test/?x=1"), "_cc"), None);
    }

    #[test]
    fn strip_keeps_other_parameters() {
        assert_eq!(strip_query_param(&u("https://a.test/p?_cc=true"), "_cc").as_str(), "https://a.test/p");
        assert_eq!(
            strip_query_param(&u("https://a.test/p?x=1&_cc=true&y=2#f"), "_cc").as_str(),
            "https://a.test/p?x=1&y=2#f"
        );
        let untouched = u("https://a.test/p?x=%7E");
        assert_eq!(strip_query_param(&untouched, "_cc"), untouched);
    }

    #[test]
    fn strip_leaves_foreign_encoding_alone() {
        assert_eq!(
            strip_query_param(&u("https://a.test/p?flag&q=a%20b&path=~x&_cc=true"), "_cc").as_str(),
            "https://a.test/p?flag&q=a%20b&path=~x"
        );
        // encoded key still matches, repeated parameters all go
        assert_eq!(
            strip_query_param(&u("https://a.test/p?%5Fcc=false&a=1&_cc=true"), "_cc").as_str(),
            "https://a.test/p?a=1"
        );
        assert_eq!(
            strip_query_param(&u("https://a.test/p?_ccx=1&_cc"), "_cc").as_str(),
            "https://a.test/p?_ccx=1"
        );
    }
}
