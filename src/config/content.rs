//! Localized modal content.
//!
//! Every language the modal can be shown in has one [`Content`] record. The
//! body text may contain the [`PRIVACY_POLICY_PLACEHOLDER`] token, which is
//! replaced by a link to the privacy policy when the modal is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token inside [`Content::body`] that marks where the privacy-policy link goes.
pub const PRIVACY_POLICY_PLACEHOLDER: &str = "--privacy-policy--";

/// Language that is used when the requested language has no content.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Content table, keyed by primary language subtag (`de`, `en`, `nl`, ...).
pub type ContentTable = BTreeMap<String, Content>;

/// The texts of the modal in a single language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Modal title
    pub title: String,
    /// Body text, may embed [`PRIVACY_POLICY_PLACEHOLDER`]
    pub body: String,
    /// Text of the privacy-policy link
    pub privacy_policy: String,
    /// Label of the "accept all" button
    pub button_accept_all: String,
    /// Label of the "accept necessary" button
    pub button_accept_technical: String,
}

impl Content {
    /// Splits the body around the first privacy-policy placeholder.
    ///
    /// Returns `(before, after)` when the placeholder is present, `None` otherwise.
    pub fn split_body(&self) -> Option<(&str, &str)> {
        self.body.split_once(PRIVACY_POLICY_PLACEHOLDER)
    }

    fn english() -> Self {
        Self {
            title: "Cookie settings".into(),
            body: "We use cookies to personalize content and analyze access to our website. Please refer to our --privacy-policy-- for more information.".into(),
            privacy_policy: "privacy policy".into(),
            button_accept_all: "Accept all cookies".into(),
            button_accept_technical: "Accept necessary cookies".into(),
        }
    }
}

/// English content, used when even the fallback language is missing from a
/// caller-supplied table.
pub fn builtin_fallback() -> Content {
    Content::english()
}

/// The content table the widget ships with.
pub fn default_content() -> ContentTable {
    let mut table = ContentTable::new();

    table.insert(
        "de".into(),
        Content {
            title: "Cookie-Einstellungen".into(),
            body: "Wir nutzen Cookies, um Inhalte zu personalisieren und die Zugriffe auf unsere Website zu analysieren. Weitere Informationen finden Sie in unserer --privacy-policy--.".into(),
            privacy_policy: "Datenschutzerklärung".into(),
            button_accept_all: "Alle Cookies akzeptieren".into(),
            button_accept_technical: "Nur notwendige Cookies akzeptieren".into(),
        },
    );
    table.insert(FALLBACK_LANGUAGE.into(), Content::english());
    table.insert(
        "nl".into(),
        Content {
            title: "Cookie instellingen".into(),
            body: "We gebruiken cookies om de inhoud te personaliseren en de toegang tot onze website te analyseren. Raadpleeg ons --privacy-policy-- voor meer informatie.".into(),
            privacy_policy: "privacybeleid".into(),
            button_accept_all: "Accepteer alle cookies".into(),
            button_accept_technical: "Accepteer noodzakelijke cookies".into(),
        },
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_languages_all_embed_the_link() {
        let table = default_content();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["de", "en", "nl"]);
        for (lang, content) in &table {
            assert!(content.split_body().is_some(), "{lang} body lacks the privacy-policy placeholder");
        }
    }

    #[test]
    fn split_body_without_placeholder() {
        let mut content = builtin_fallback();
        content.body = "No link here.".into();
        assert_eq!(content.split_body(), None);
    }

    #[test]
    fn deserializes_browser_field_names() {
        let json = r#"{
            "title": "Réglages",
            "body": "Voir --privacy-policy--.",
            "privacyPolicy": "confidentialité",
            "buttonAcceptAll": "Tout accepter",
            "buttonAcceptTechnical": "Le nécessaire"
        }"#;
        let content: Content = serde_json::from_str(json).unwrap();
        assert_eq!(content.privacy_policy, "confidentialité");
        assert_eq!(content.split_body(), Some(("Voir ", ".")));
    }
}
