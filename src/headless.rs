//! Headless document: an in-memory [`Page`] and [`Presentation`].
//!
//! [`HeadlessDocument`] models just enough of a browser page to run the
//! widget without one: a ready state, a location with a history, a list of
//! links, a body the modal is appended to, and timers driven by a virtual
//! clock. The host side of the API (`load`, `advance`, `click_button`,
//! `click_link`, `notify_document_changed`) returns the [`PageEvent`]s a
//! browser would have dispatched, ready to be fed to
//! [`ConsentWidget::handle_event`](crate::widget::ConsentWidget::handle_event).
//!
//! ```rust
//! use cookie_consent::headless::HeadlessDocument;
//! use cookie_consent::page::{Page, ReadyState};
//!
//! let doc = HeadlessDocument::new("https://example.com/".parse().unwrap());
//! assert_eq!(doc.ready_state(), ReadyState::Loading);
//! let ready = doc.load();
//! assert!(doc.ready_state().is_ready());
//! # let _ = ready;
//! ```

use crate::markup::{ConsentButton, ModalMarkup};
use crate::page::{Display, Link, LinkId, Page, PageEvent, Presentation, ReadyState, TimerId};
use anyhow::{bail, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// An element in the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub id: String,
    /// Markup the widget mounted, `None` for elements that were already in the page
    pub html: Option<String>,
    /// Inline `style` attribute of the element
    pub style: Option<String>,
    pub display: Display,
    /// How many times click handlers were attached to the buttons
    pub button_bindings: usize,
}

#[derive(Debug)]
struct PendingTimer {
    id: TimerId,
    due: Duration,
    period: Option<Duration>,
    seq: u64,
}

#[derive(Debug)]
struct LinkState {
    link: Link,
    click_listeners: usize,
}

#[derive(Debug)]
struct State {
    ready_state: ReadyState,
    user_agent: String,
    document_language: Option<String>,
    navigator_language: Option<String>,
    location: Url,
    history: Vec<Url>,
    history_blocked: bool,
    links: Vec<LinkState>,
    body: Vec<ElementSnapshot>,
    timers: Vec<PendingTimer>,
    timer_seq: u64,
    now: Duration,
    document_change_listeners: usize,
}

/// In-memory page used by tests and non-browser hosts.
#[derive(Debug)]
pub struct HeadlessDocument {
    state: Mutex<State>,
}

impl HeadlessDocument {
    /// Creates a loading document at `location`.
    pub fn new(location: Url) -> Self {
        Self {
            state: Mutex::new(State {
                ready_state: ReadyState::Loading,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                document_language: None,
                navigator_language: None,
                history: vec![location.clone()],
                location,
                history_blocked: false,
                links: Vec::new(),
                body: Vec::new(),
                timers: Vec::new(),
                timer_seq: 0,
                now: Duration::ZERO,
                document_change_listeners: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.state().ready_state = ready_state;
    }

    pub fn set_user_agent(&self, user_agent: impl Into<String>) {
        self.state().user_agent = user_agent.into();
    }

    pub fn set_document_language(&self, lang: impl Into<String>) {
        self.state().document_language = Some(lang.into());
    }

    pub fn set_navigator_language(&self, lang: impl Into<String>) {
        self.state().navigator_language = Some(lang.into());
    }

    /// Makes every history replacement fail, like a sandboxed frame would.
    pub fn block_history(&self, blocked: bool) {
        self.state().history_blocked = blocked;
    }

    /// Finishes parsing: the document becomes interactive.
    pub fn load(&self) -> PageEvent {
        self.set_ready_state(ReadyState::Interactive);
        PageEvent::DocumentReady
    }

    /// Appends a link with `href` to the document.
    pub fn add_link(&self, href: impl Into<String>) -> LinkId {
        let id = LinkId::new();
        self.state().links.push(LinkState {
            link: Link {
                id,
                href: href.into(),
                processed: false,
            },
            click_listeners: 0,
        });
        id
    }

    pub fn link(&self, id: LinkId) -> Option<Link> {
        self.state()
            .links
            .iter()
            .find(|l| l.link.id == id)
            .map(|l| l.link.clone())
    }

    /// Number of click listeners attached to `id`.
    pub fn link_listeners(&self, id: LinkId) -> usize {
        self.state()
            .links
            .iter()
            .find(|l| l.link.id == id)
            .map_or(0, |l| l.click_listeners)
    }

    /// Clicks a link. Returns one event per attached listener.
    pub fn click_link(&self, id: LinkId) -> Vec<PageEvent> {
        let listeners = self.link_listeners(id);
        vec![PageEvent::LinkClicked(id); listeners]
    }

    /// Puts an element with `id` into the body, as if the page shipped it.
    pub fn insert_element(&self, id: impl Into<String>) {
        self.state().body.push(ElementSnapshot {
            id: id.into(),
            html: None,
            style: None,
            display: Display::None,
            button_bindings: 0,
        });
    }

    pub fn element(&self, id: &str) -> Option<ElementSnapshot> {
        self.state().body.iter().find(|e| e.id == id).cloned()
    }

    /// Number of elements in the body carrying `id`.
    pub fn element_count(&self, id: &str) -> usize {
        self.state().body.iter().filter(|e| e.id == id).count()
    }

    /// Clicks a modal button. Nothing happens unless the element is visible
    /// and its buttons are wired.
    pub fn click_button(&self, id: &str, button: ConsentButton) -> Option<PageEvent> {
        let state = self.state();
        let element = state.body.iter().find(|e| e.id == id)?;
        let clickable = element.display == Display::Block
            && element.button_bindings > 0
            && element
                .html
                .as_deref()
                .is_some_and(|html| html.contains(button.marker_class()));

        clickable.then_some(PageEvent::ButtonClicked(button))
    }

    /// Reports a document change to every registered listener.
    pub fn notify_document_changed(&self) -> Vec<PageEvent> {
        vec![PageEvent::DocumentChanged; self.state().document_change_listeners]
    }

    pub fn history(&self) -> Vec<Url> {
        self.state().history.clone()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.state().now
    }

    pub fn pending_timers(&self) -> usize {
        self.state().timers.len()
    }

    /// Moves the virtual clock forward and returns the timers that fired, in order.
    pub fn advance(&self, by: Duration) -> Vec<PageEvent> {
        let mut state = self.state();
        let target = state.now + by;
        let mut fired = Vec::new();

        loop {
            let next = state
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= target)
                .min_by_key(|(_, t)| (t.due, t.seq))
                .map(|(idx, _)| idx);
            let Some(idx) = next else {
                break;
            };

            state.now = state.timers[idx].due;
            fired.push(PageEvent::TimerElapsed(state.timers[idx].id));

            match state.timers[idx].period {
                Some(period) => {
                    let seq = state.timer_seq;
                    state.timer_seq += 1;
                    let timer = &mut state.timers[idx];
                    timer.due += period.max(Duration::from_millis(1));
                    timer.seq = seq;
                }
                None => {
                    state.timers.remove(idx);
                }
            }
        }

        state.now = target;
        fired
    }

    fn schedule(&self, delay: Duration, period: Option<Duration>) -> TimerId {
        let mut state = self.state();
        let id = TimerId::new();
        let seq = state.timer_seq;
        state.timer_seq += 1;
        let due = state.now + delay;
        state.timers.push(PendingTimer { id, due, period, seq });
        id
    }
}

impl Page for HeadlessDocument {
    fn ready_state(&self) -> ReadyState {
        self.state().ready_state
    }

    fn user_agent(&self) -> String {
        self.state().user_agent.clone()
    }

    fn document_language(&self) -> Option<String> {
        self.state().document_language.clone()
    }

    fn navigator_language(&self) -> Option<String> {
        self.state().navigator_language.clone()
    }

    fn location(&self) -> Url {
        self.state().location.clone()
    }

    fn replace_location(&self, url: &Url) -> Result<()> {
        let mut state = self.state();
        if state.history_blocked {
            bail!("history.replaceState is not allowed in this document");
        }
        if url.origin() != state.location.origin() {
            bail!("cannot replace {} with a URL of another origin", state.location);
        }

        state.location = url.clone();
        if let Some(current) = state.history.last_mut() {
            *current = url.clone();
        }
        Ok(())
    }

    fn links(&self) -> Vec<Link> {
        self.state().links.iter().map(|l| l.link.clone()).collect()
    }

    fn mark_link_processed(&self, link: LinkId) {
        if let Some(l) = self.state().links.iter_mut().find(|l| l.link.id == link) {
            l.link.processed = true;
        }
    }

    fn listen_for_link_clicks(&self, link: LinkId) {
        if let Some(l) = self.state().links.iter_mut().find(|l| l.link.id == link) {
            l.click_listeners += 1;
        }
    }

    fn link_href(&self, link: LinkId) -> Option<String> {
        self.link(link).map(|l| l.href)
    }

    fn set_link_href(&self, link: LinkId, href: &str) {
        if let Some(l) = self.state().links.iter_mut().find(|l| l.link.id == link) {
            l.link.href = href.to_string();
        }
    }

    fn set_timeout(&self, delay: Duration) -> TimerId {
        self.schedule(delay, None)
    }

    fn set_interval(&self, period: Duration) -> TimerId {
        self.schedule(period, Some(period))
    }

    fn listen_for_document_changes(&self) {
        self.state().document_change_listeners += 1;
    }
}

impl Presentation for HeadlessDocument {
    fn has_element(&self, id: &str) -> bool {
        self.state().body.iter().any(|e| e.id == id)
    }

    fn mount(&self, id: &str, markup: &ModalMarkup) -> Result<()> {
        if !self.ready_state().is_ready() {
            bail!("document body is not available while loading");
        }
        self.state().body.push(ElementSnapshot {
            id: id.to_string(),
            html: Some(markup.html().to_string()),
            style: Some(markup.container_style().to_string()),
            display: Display::Block,
            button_bindings: 0,
        });
        Ok(())
    }

    fn bind_buttons(&self, id: &str) {
        if let Some(e) = self.state().body.iter_mut().find(|e| e.id == id) {
            e.button_bindings += 1;
        }
    }

    fn set_display(&self, id: &str, display: Display) {
        if let Some(e) = self.state().body.iter_mut().find(|e| e.id == id) {
            e.display = display;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConsentConfig, ResolvedConfig};

    fn doc() -> HeadlessDocument {
        HeadlessDocument::new(Url::parse("https://shop.test/cart?x=1").unwrap())
    }

    #[test]
    fn timers_fire_in_due_order() {
        let doc = doc();
        let slow = doc.set_timeout(Duration::from_millis(50));
        let fast = doc.set_timeout(Duration::from_millis(10));
        let tick = doc.set_interval(Duration::from_millis(20));

        assert!(doc.advance(Duration::from_millis(5)).is_empty());
        let fired = doc.advance(Duration::from_millis(60));
        assert_eq!(
            fired,
            vec![
                PageEvent::TimerElapsed(fast),
                PageEvent::TimerElapsed(tick),
                PageEvent::TimerElapsed(tick),
                PageEvent::TimerElapsed(slow),
                PageEvent::TimerElapsed(tick),
            ]
        );
        assert_eq!(doc.now(), Duration::from_millis(65));
        // only the interval is left
        assert_eq!(doc.pending_timers(), 1);
    }

    #[test]
    fn replace_location_keeps_origin_and_can_be_blocked() {
        let doc = doc();
        let cleaned = Url::parse("https://shop.test/cart").unwrap();
        doc.replace_location(&cleaned).unwrap();
        assert_eq!(doc.location(), cleaned);
        assert_eq!(doc.history(), vec![cleaned.clone()]);

        assert!(doc.replace_location(&Url::parse("https://evil.test/").unwrap()).is_err());

        doc.block_history(true);
        assert!(doc.replace_location(&Url::parse("https://shop.test/").unwrap()).is_err());
        assert_eq!(doc.location(), cleaned);
    }

    #[test]
    fn buttons_are_clickable_only_when_visible_and_bound() {
        let doc = doc();
        doc.load();
        let markup = ModalMarkup::build(&ResolvedConfig::resolve(ConsentConfig::default(), None));

        doc.mount("m", &markup).unwrap();
        assert_eq!(doc.click_button("m", ConsentButton::AcceptAll), None);

        doc.bind_buttons("m");
        for button in ConsentButton::ALL {
            assert_eq!(doc.click_button("m", button), Some(PageEvent::ButtonClicked(button)));
        }
        assert_eq!(doc.element("m").unwrap().style.as_deref(), Some(markup.container_style()));

        doc.set_display("m", Display::None);
        assert_eq!(doc.click_button("m", ConsentButton::AcceptNecessary), None);
    }

    #[test]
    fn mounting_needs_a_body() {
        let doc = doc();
        let markup = ModalMarkup::build(&ResolvedConfig::resolve(ConsentConfig::default(), None));
        assert!(doc.mount("m", &markup).is_err());
        assert!(!doc.has_element("m"));
    }

    #[test]
    fn link_clicks_report_once_per_listener() {
        let doc = doc();
        let id = doc.add_link("https://other.test/");
        assert!(doc.click_link(id).is_empty());

        doc.listen_for_link_clicks(id);
        doc.listen_for_link_clicks(id);
        assert_eq!(doc.click_link(id).len(), 2);

        doc.mark_link_processed(id);
        doc.set_link_href(id, "https://other.test/?a=b");
        let link = doc.link(id).unwrap();
        assert!(link.processed);
        assert_eq!(link.href, "https://other.test/?a=b");
    }
}
