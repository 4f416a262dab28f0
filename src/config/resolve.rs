use super::content::{builtin_fallback, Content, ContentTable, FALLBACK_LANGUAGE};
use super::ConsentConfig;

/// Token in the privacy-policy URL that is replaced by the resolved language.
pub const LANGUAGE_TOKEN: &str = "{language}";

/// Resolves a language tag to a key of `table`.
///
/// Only the primary subtag is kept (`en-US` → `en`). When the table has no
/// entry for it, [`FALLBACK_LANGUAGE`] is returned.
pub fn resolve_language(tag: &str, table: &ContentTable) -> String {
    let primary = tag.split('-').next().unwrap_or_default().trim();

    if table.contains_key(primary) {
        return primary.to_string();
    }

    let lowered = primary.to_ascii_lowercase();
    if table.contains_key(&lowered) {
        return lowered;
    }

    FALLBACK_LANGUAGE.to_string()
}

/// Immutable configuration the widget runs with, computed once at construction.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    config: ConsentConfig,
    language: String,
    content: Content,
    privacy_policy_url: String,
}

impl ResolvedConfig {
    /// Resolves `config`. `page_language` is used when the config itself has no `lang`.
    pub fn resolve(config: ConsentConfig, page_language: Option<&str>) -> Self {
        let tag = config
            .lang
            .as_deref()
            .or(page_language)
            .unwrap_or(FALLBACK_LANGUAGE);

        let language = resolve_language(tag, &config.content);
        let content = config
            .content
            .get(&language)
            .cloned()
            .unwrap_or_else(builtin_fallback);
        let privacy_policy_url = config.privacy_policy_url.replacen(LANGUAGE_TOKEN, &language, 1);

        log::debug!("consent: resolved language '{}' from tag '{}'", language, tag);

        Self {
            config,
            language,
            content,
            privacy_policy_url,
        }
    }

    pub fn config(&self) -> &ConsentConfig {
        &self.config
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn privacy_policy_url(&self) -> &str {
        &self.privacy_policy_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_content;

    #[test]
    fn region_subtags_are_dropped() {
        let table = default_content();
        for (tag, expected) in [
            ("de-CH", "de"),
            ("de-DE", "de"),
            ("nl-BE", "nl"),
            ("en-US", "en"),
            ("fr-FR", "en"),
            ("pt-BR", "en"),
            ("DE-at", "de"),
            ("", "en"),
        ] {
            assert_eq!(resolve_language(tag, &table), expected, "tag {tag}");
        }
    }

    #[test]
    fn resolved_language_is_always_in_the_table() {
        let table = default_content();
        for tag in ["zz", "x-klingon", "nl", "-", "en-"] {
            assert!(table.contains_key(&resolve_language(tag, &table)));
        }
    }

    #[test]
    fn configured_lang_beats_page_language() {
        let cfg = ConsentConfig::builder().lang("nl-NL").build();
        let resolved = ResolvedConfig::resolve(cfg, Some("de"));
        assert_eq!(resolved.language(), "nl");
        assert_eq!(resolved.content().title, "Cookie instellingen");

        let resolved = ResolvedConfig::resolve(ConsentConfig::default(), Some("de-CH"));
        assert_eq!(resolved.language(), "de");
    }

    #[test]
    fn privacy_url_gets_the_language() {
        let cfg = ConsentConfig::builder()
            .lang("de-DE")
            .privacy_policy_url("/{language}/privacy")
            .build();
        let resolved = ResolvedConfig::resolve(cfg, None);
        assert_eq!(resolved.privacy_policy_url(), "/de/privacy");
    }

    #[test]
    fn table_without_english_still_renders() {
        let mut table = ContentTable::new();
        table.insert("fr".into(), builtin_fallback());
        let cfg = ConsentConfig::builder().content(table).lang("es").build();

        let resolved = ResolvedConfig::resolve(cfg, None);
        assert_eq!(resolved.language(), "en");
        assert_eq!(resolved.content().title, "Cookie settings");
    }
}
