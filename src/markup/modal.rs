use super::{Element, Node};
use crate::config::ResolvedConfig;

/// Inline style of the container the modal markup is mounted in.
pub const CONTAINER_STYLE: &str = "position:absolute; z-index:1000";

/// One of the two action buttons of the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentButton {
    /// "Accept necessary cookies": declines tracking
    AcceptNecessary,
    /// "Accept all cookies": allows tracking
    AcceptAll,
}

impl ConsentButton {
    pub const ALL: [ConsentButton; 2] = [ConsentButton::AcceptNecessary, ConsentButton::AcceptAll];

    /// Fixed class the button carries next to the configured style classes.
    pub fn marker_class(&self) -> &'static str {
        match self {
            ConsentButton::AcceptNecessary => "btn-accept-necessary",
            ConsentButton::AcceptAll => "btn-accept-all",
        }
    }
}

/// The inner markup of the consent modal, built once per widget.
///
/// The wrapper carries `cookie-consent-modal` (plus `block-access` when the
/// page is blocked) and the position class; inside are three slots: the
/// header with the title, the body with the privacy-policy link, and the
/// footer with both buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalMarkup {
    root: Element,
    html: String,
}

impl ModalMarkup {
    pub fn build(resolved: &ResolvedConfig) -> Self {
        let config = resolved.config();
        let content = resolved.content();

        let mut wrapper_classes = vec!["cookie-consent-modal"];
        if config.block_access {
            wrapper_classes.push("block-access");
        }

        let header = Element::new("div")
            .classes(["modal-header"])
            .child(Element::new("h3").classes(["modal-title"]).text(content.title.as_str()));

        let mut body = Element::new("div").classes(["modal-body"]);
        match content.split_body() {
            Some((before, after)) => {
                let link = Element::new("a")
                    .attr("href", resolved.privacy_policy_url())
                    .text(content.privacy_policy.as_str());
                body = body.text(before).child(link).text(after);
            }
            None => body = body.text(content.body.as_str()),
        }

        let buttons = Element::new("div")
            .classes(["buttons"])
            .child(
                Element::new("button")
                    .classes([
                        ConsentButton::AcceptNecessary.marker_class(),
                        config.button_secondary_class.as_str(),
                    ])
                    .text(content.button_accept_technical.as_str()),
            )
            .child(
                Element::new("button")
                    .classes([ConsentButton::AcceptAll.marker_class(), config.button_primary_class.as_str()])
                    .text(content.button_accept_all.as_str()),
            );
        let footer = Element::new("div").classes(["modal-footer"]).child(buttons);

        let root = Element::new("div").classes(wrapper_classes).child(
            Element::new("div")
                .classes(["modal-content-wrap", config.position.as_str()])
                .child(
                    Element::new("div")
                        .classes(["modal-content"])
                        .child(header)
                        .child(body)
                        .child(footer),
                ),
        );

        let html = Node::from(root.clone()).render();
        Self { root, html }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// The `style` attribute for the container created around [`html`](Self::html).
    pub fn container_style(&self) -> &'static str {
        CONTAINER_STYLE
    }

    /// The element of `button` inside the markup.
    pub fn button(&self, button: ConsentButton) -> Option<&Element> {
        self.root.find_by_class(button.marker_class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConsentConfig, Content, ContentTable, Position};

    fn build(config: ConsentConfig) -> ModalMarkup {
        ModalMarkup::build(&ResolvedConfig::resolve(config, None))
    }

    #[test]
    fn english_default_markup() {
        let markup = build(ConsentConfig::default());
        assert_eq!(
            markup.html(),
            concat!(
                r#"<div class="cookie-consent-modal"><div class="modal-content-wrap right"><div class="modal-content">"#,
                r#"<div class="modal-header"><h3 class="modal-title">Cookie settings</h3></div>"#,
                r#"<div class="modal-body">We use cookies to personalize content and analyze access to our website. Please refer to our <a href="privacy-policy.html">privacy policy</a> for more information.</div>"#,
                r#"<div class="modal-footer"><div class="buttons">"#,
                r#"<button class="btn-accept-necessary btn btn-primary">Accept necessary cookies</button>"#,
                r#"<button class="btn-accept-all btn btn-primary">Accept all cookies</button>"#,
                r#"</div></div></div></div></div>"#,
            )
        );
    }

    #[test]
    fn wrapper_encodes_blocking_and_position() {
        let markup = build(
            ConsentConfig::builder()
                .block_access(true)
                .position(Position::Left)
                .button_primary_class("primary")
                .button_secondary_class("secondary outline")
                .build(),
        );

        assert!(markup.root().has_class("block-access"));
        assert!(markup.root().find_by_class("modal-content-wrap").unwrap().has_class("left"));

        for button in ConsentButton::ALL {
            let element = markup.button(button).unwrap();
            assert_eq!(element.tag(), "button");
            assert!(element.has_class(button.marker_class()));
        }

        let accept_all = markup.button(ConsentButton::AcceptAll).unwrap();
        assert!(accept_all.has_class("primary"));
        let necessary = markup.button(ConsentButton::AcceptNecessary).unwrap();
        assert!(necessary.has_class("secondary") && necessary.has_class("outline"));
    }

    #[test]
    fn german_markup_links_the_localized_policy() {
        let markup = build(
            ConsentConfig::builder()
                .lang("de-DE")
                .privacy_policy_url("/{language}/datenschutz")
                .build(),
        );
        let link = markup.root().find_by_class("modal-body").and_then(|body| {
            body.children().iter().find_map(|n| match n {
                Node::Element(el) if el.tag() == "a" => Some(el),
                _ => None,
            })
        });
        let link = link.unwrap();
        assert_eq!(link.get_attr("href"), Some("/de/datenschutz"));
        assert_eq!(link.text_content(), "Datenschutzerklärung");
        assert_eq!(
            markup.button(ConsentButton::AcceptAll).unwrap().text_content(),
            "Alle Cookies akzeptieren"
        );
    }

    #[test]
    fn content_values_cannot_inject_markup() {
        let mut table = ContentTable::new();
        table.insert(
            "en".into(),
            Content {
                title: "<img src=x onerror=alert(1)>".into(),
                body: "Body --privacy-policy-- end".into(),
                privacy_policy: "policy".into(),
                button_accept_all: "All".into(),
                button_accept_technical: "Needed".into(),
            },
        );
        let markup = build(
            ConsentConfig::builder()
                .content(table)
                .privacy_policy_url(r#"x" onclick="steal()"#)
                .build(),
        );

        assert!(!markup.html().contains("<img"));
        assert!(markup.html().contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(markup.html().contains(r#"href="x&quot; onclick=&quot;steal()""#));
    }
}
