//! Host capabilities and page events.
//!
//! The widget reaches the browser only through two traits:
//!
//! - [`Presentation`]: mount the modal markup once, toggle its visibility and
//!   wire its two buttons.
//! - [`Page`]: everything else the widget reads from or does to the page:
//!   ready state, user agent, language, location and history, links, timers
//!   and document-change notifications.
//!
//! Work that a browser would run in a callback (document ready, timers,
//! clicks) is delivered back to the widget as a [`PageEvent`] through
//! [`ConsentWidget::handle_event`](crate::widget::ConsentWidget::handle_event).
//! Events only arrive for things the widget asked for: a `TimerElapsed` for a
//! timer it scheduled, a `LinkClicked` for a link it listens to, and so on.

use crate::markup::{ConsentButton, ModalMarkup};
use anyhow::Result;
use std::fmt::Display as FmtDisplay;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Identifies a hyperlink on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(Uuid);

impl LinkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl FmtDisplay for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a timer scheduled through [`Page::set_timeout`] or [`Page::set_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(Uuid);

impl TimerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl FmtDisplay for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document loading state, as `document.readyState` reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// True once the document can be modified (`interactive` or `complete`).
    pub fn is_ready(&self) -> bool {
        !matches!(self, ReadyState::Loading)
    }
}

/// CSS display of the modal container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    None,
}

/// A hyperlink as the page currently has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    /// The `href` attribute, possibly relative
    pub href: String,
    /// Set once the widget wired the link for cross-domain propagation
    pub processed: bool,
}

/// Callbacks the host delivers to the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// The document finished parsing (`DOMContentLoaded`)
    DocumentReady,
    /// A timer scheduled by the widget fired
    TimerElapsed(TimerId),
    /// One of the modal buttons was clicked
    ButtonClicked(ConsentButton),
    /// A link the widget listens to was clicked, before navigation
    LinkClicked(LinkId),
    /// The host changed the document (new links may have been added)
    DocumentChanged,
}

/// The page the widget is embedded in.
pub trait Page: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    /// The user agent string the client reports.
    fn user_agent(&self) -> String;

    /// The `lang` attribute of the document element, if any.
    fn document_language(&self) -> Option<String>;

    /// The language the user agent reports, if any.
    fn navigator_language(&self) -> Option<String>;

    /// Current page URL.
    fn location(&self) -> Url;

    /// Replaces the visible URL without reloading (`history.replaceState`).
    fn replace_location(&self, url: &Url) -> Result<()>;

    /// All hyperlinks currently in the document.
    fn links(&self) -> Vec<Link>;

    fn mark_link_processed(&self, link: LinkId);

    /// Requests a [`PageEvent::LinkClicked`] for every click on `link`.
    fn listen_for_link_clicks(&self, link: LinkId);

    fn link_href(&self, link: LinkId) -> Option<String>;

    fn set_link_href(&self, link: LinkId, href: &str);

    /// Schedules a single [`PageEvent::TimerElapsed`] after `delay`.
    fn set_timeout(&self, delay: Duration) -> TimerId;

    /// Schedules a [`PageEvent::TimerElapsed`] every `period`.
    fn set_interval(&self, period: Duration) -> TimerId;

    /// Requests a [`PageEvent::DocumentChanged`] whenever the host reports a document change.
    fn listen_for_document_changes(&self);
}

/// Displays the consent modal.
pub trait Presentation: Send + Sync {
    /// True when an element with `id` exists in the document.
    fn has_element(&self, id: &str) -> bool;

    /// Creates a visible container with `id` holding `markup` and appends it to the body.
    ///
    /// The container carries the inline style [`ModalMarkup::container_style`].
    fn mount(&self, id: &str, markup: &ModalMarkup) -> Result<()>;

    /// Requests a [`PageEvent::ButtonClicked`] for clicks on the buttons inside `id`.
    fn bind_buttons(&self, id: &str);

    fn set_display(&self, id: &str, display: Display);
}
