//! Widget configuration.
//!
//! [`ConsentConfig`] holds every option the widget understands. It starts from
//! sensible defaults via [`Default`] and can be customized in two ways:
//!
//! - with the fluent [`ConsentConfig::builder()`], or
//! - from a JSON settings object with browser option names
//!   ([`ConsentConfig::from_json_overrides`]). Overrides are merged **shallowly**
//!   onto the defaults: a top-level key supplied by the caller replaces the
//!   default value as a whole, so a supplied `content` table replaces the
//!   builtin one instead of being merged into it.
//!
//! # Examples
//!
//! ```rust
//! use cookie_consent::config::{ConsentConfig, Position};
//!
//! let cfg = ConsentConfig::builder()
//!     .lang("de-CH")
//!     .cookie_name("cc")
//!     .position(Position::Left)
//!     .build();
//! assert_eq!(cfg.cookie_name, "cc");
//! ```
//!
//! ```rust
//! use cookie_consent::config::ConsentConfig;
//! # fn main() -> Result<(), cookie_consent::ConsentError> {
//! let cfg = ConsentConfig::from_settings_str(r#"{ "lang": "nl", "blockAccess": true }"#)?;
//! assert!(cfg.block_access);
//! assert!(cfg.auto_show_modal);
//! # Ok(()) }
//! ```
//!
//! A resolved, immutable view of the configuration (effective language,
//! content and privacy-policy URL) is produced by [`ResolvedConfig::resolve`].

mod content;
mod resolve;

pub use content::{
    builtin_fallback, default_content, Content, ContentTable, FALLBACK_LANGUAGE, PRIVACY_POLICY_PLACEHOLDER,
};
pub use resolve::{resolve_language, ResolvedConfig, LANGUAGE_TOKEN};

use crate::errors::ConsentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Screen position of the modal when access is not blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    #[default]
    Right,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Right => "right",
        }
    }
}

impl FromStr for Position {
    type Err = ConsentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Position::Left),
            "right" => Ok(Position::Right),
            _ => Err(ConsentError::InvalidPosition(s.to_string())),
        }
    }
}

/// Where the page language is read from when no `lang` is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSource {
    /// The `lang` attribute of the document element
    #[default]
    Document,
    /// The language the user agent reports
    Navigator,
}

/// How links added after the initial scan get their cross-domain wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RescanPolicy {
    /// Scan the links once, on document ready
    Once,
    /// Scan again every time the host reports a document change
    #[default]
    OnDocumentChange,
    /// Scan again on a recurring timer (milliseconds)
    Every(u64),
}

/// Invoked after the visitor picked one of the two buttons.
#[derive(Clone)]
pub struct PostSelectionCallback(Arc<dyn Fn(bool) + Send + Sync>);

impl PostSelectionCallback {
    pub fn new(f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Calls the callback. `accepted` is true when all cookies were accepted.
    pub fn call(&self, accepted: bool) {
        (self.0)(accepted)
    }
}

impl fmt::Debug for PostSelectionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PostSelectionCallback(..)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsentConfig {
    /// Classes of the "accept all" button, only used for styling
    pub button_primary_class: String,
    /// Classes of the "accept necessary" button, only used for styling
    pub button_secondary_class: String,
    /// Privacy policy URL, `{language}` is replaced by the resolved language
    pub privacy_policy_url: String,
    /// Show the modal automatically when no decision was made yet
    pub auto_show_modal: bool,
    /// Language tag to show the modal in (`de`, `en-US`, ...)
    pub lang: Option<String>,
    /// Where the language comes from when `lang` is not set
    pub language_source: LanguageSource,
    /// Block access to the page until a choice was made
    pub block_access: bool,
    /// Modal position, when access is not blocked
    pub position: Position,
    /// Content in all needed languages
    pub content: ContentTable,
    /// Name of the consent cookie. Its value is `true` when tracking was accepted.
    pub cookie_name: String,
    /// Element id of the modal
    pub modal_id: String,
    pub cross_domain_query_parameter_name: String,
    /// Trusted hosts for cross-domain propagation. A non-empty list enables it.
    pub cross_domain_domains: Vec<String>,
    /// Name of the analytics data layer. `None` disables all analytics output.
    pub google_tag_data_layer: Option<String>,
    /// Explicit cookie domain
    pub domain: Option<String>,
    pub rescan_policy: RescanPolicy,
    /// Delay between document ready and the auto-show, in milliseconds
    #[serde(rename = "autoShowDelay")]
    pub auto_show_delay_ms: u64,
    #[serde(skip)]
    pub post_selection_callback: Option<PostSelectionCallback>,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            button_primary_class: "btn btn-primary".into(),
            button_secondary_class: "btn btn-primary".into(),
            privacy_policy_url: "privacy-policy.html".into(),
            auto_show_modal: true,
            lang: None,
            language_source: LanguageSource::Document,
            block_access: false,
            position: Position::Right,
            content: default_content(),
            cookie_name: "cookie-consent-tracking-allowed".into(),
            modal_id: "cookieConsentModal".into(),
            cross_domain_query_parameter_name: "_cc".into(),
            cross_domain_domains: Vec::new(),
            google_tag_data_layer: Some("dataLayer".into()),
            domain: None,
            rescan_policy: RescanPolicy::OnDocumentChange,
            auto_show_delay_ms: 1,
            post_selection_callback: None,
        }
    }
}

impl ConsentConfig {
    pub fn builder() -> ConsentConfigBuilder {
        ConsentConfigBuilder::default()
    }

    pub fn auto_show_delay(&self) -> Duration {
        Duration::from_millis(self.auto_show_delay_ms)
    }

    /// Merges a JSON object of overrides onto the defaults.
    ///
    /// The merge is shallow: every top-level key in `overrides` replaces the
    /// default value. Unknown keys are ignored.
    pub fn from_json_overrides(overrides: &Value) -> Result<Self, ConsentError> {
        let Value::Object(overrides) = overrides else {
            return Err(ConsentError::OverridesNotAnObject);
        };

        let mut merged = serde_json::to_value(Self::default())?;
        if let Value::Object(base) = &mut merged {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
        }

        Ok(serde_json::from_value(merged)?)
    }

    /// Parses a settings object (as found in a `COOKIE_CONSENT_SETTINGS` global)
    /// and merges it onto the defaults.
    pub fn from_settings_str(settings: &str) -> Result<Self, ConsentError> {
        let overrides: Value = serde_json::from_str(settings)?;
        Self::from_json_overrides(&overrides)
    }
}

/// Builder for [`ConsentConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConsentConfigBuilder {
    inner: ConsentConfig,
}

impl ConsentConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ConsentConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn button_primary_class<S: Into<String>>(self, class: S) -> Self { self.map(|c| c.button_primary_class = class.into()) }
    pub fn button_secondary_class<S: Into<String>>(self, class: S) -> Self { self.map(|c| c.button_secondary_class = class.into()) }
    pub fn privacy_policy_url<S: Into<String>>(self, url: S) -> Self { self.map(|c| c.privacy_policy_url = url.into()) }
    pub fn auto_show_modal(self, on: bool) -> Self { self.map(|c| c.auto_show_modal = on) }
    pub fn lang<S: Into<String>>(self, lang: S) -> Self { self.map(|c| c.lang = Some(lang.into())) }
    pub fn language_source(self, source: LanguageSource) -> Self { self.map(|c| c.language_source = source) }
    pub fn block_access(self, on: bool) -> Self { self.map(|c| c.block_access = on) }
    pub fn position(self, position: Position) -> Self { self.map(|c| c.position = position) }
    pub fn content(self, content: ContentTable) -> Self { self.map(|c| c.content = content) }
    pub fn cookie_name<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.cookie_name = name.into()) }
    pub fn modal_id<S: Into<String>>(self, id: S) -> Self { self.map(|c| c.modal_id = id.into()) }
    pub fn cross_domain_query_parameter_name<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.cross_domain_query_parameter_name = name.into()) }
    pub fn cross_domain_domains<I, S>(self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|c| c.cross_domain_domains = domains.into_iter().map(Into::into).collect())
    }
    pub fn google_tag_data_layer<S: Into<String>>(self, name: Option<S>) -> Self { self.map(|c| c.google_tag_data_layer = name.map(Into::into)) }
    pub fn domain<S: Into<String>>(self, domain: S) -> Self { self.map(|c| c.domain = Some(domain.into())) }
    pub fn rescan_policy(self, policy: RescanPolicy) -> Self { self.map(|c| c.rescan_policy = policy) }
    pub fn auto_show_delay(self, delay: Duration) -> Self { self.map(|c| c.auto_show_delay_ms = delay.as_millis() as u64) }
    pub fn post_selection_callback(self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.map(|c| c.post_selection_callback = Some(PostSelectionCallback::new(f)))
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ConsentConfig)) -> Self { self.map(f) }

    pub fn build(self) -> ConsentConfig {
        self.inner
    }
}
