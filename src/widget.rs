//! The consent widget.
//!
//! [`ConsentWidget`] owns the resolved configuration and the cached modal
//! markup, and drives the modal lifecycle and the consent decision through
//! the capabilities in [`WidgetServices`].
//!
//! # Lifecycle
//!
//! On construction the widget reads the consent cookie and reports the current
//! state to the data layer. When no decision exists and auto-show is on, the
//! modal is shown a short delay after the document is ready. The delay gives
//! cross-domain propagation the chance to apply a decision carried in the URL
//! first, in which case the modal is never shown.
//!
//! The modal moves through three states:
//!
//! ```text
//! Unmounted --show()--> Visible <--show()/hide()--> Hidden
//! ```
//!
//! The container is created once; later `show()` calls only toggle its display.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cookie_consent::config::ConsentConfig;
//! use cookie_consent::cookies::DocumentCookieJar;
//! use cookie_consent::headless::HeadlessDocument;
//! use cookie_consent::widget::{ConsentWidget, ModalState, WidgetServices};
//!
//! let doc = Arc::new(HeadlessDocument::new("https://example.com/".parse().unwrap()));
//! let jar = Arc::new(DocumentCookieJar::new());
//! let services = WidgetServices::new(jar, doc.clone(), doc.clone());
//!
//! let mut widget = ConsentWidget::new(ConsentConfig::default(), services);
//! widget.handle_event(doc.load());
//! for event in doc.advance(std::time::Duration::from_millis(10)) {
//!     widget.handle_event(event);
//! }
//! assert_eq!(widget.modal_state(), ModalState::Visible);
//!
//! widget.accept().unwrap();
//! assert!(widget.tracking_allowed());
//! assert_eq!(widget.modal_state(), ModalState::Hidden);
//! ```

mod cross_domain;

pub use cross_domain::{append_consent_param, is_trusted_target, query_param, strip_query_param};

use crate::config::{ConsentConfig, LanguageSource, ResolvedConfig};
use crate::cookies::{Cookie, CookieStorage};
use crate::datalayer::{
    ConsentLevel, ConsentMode, DataLayer, DataLayerEntry, NullDataLayer, COOKIE_CONSENT_EVENT,
    REVOKE_COOKIE_CONSENT_EVENT,
};
use crate::errors::ConsentError;
use crate::markup::{ConsentButton, ModalMarkup};
use crate::page::{Display, Page, PageEvent, Presentation, TimerId};
use std::sync::Arc;
use time::OffsetDateTime;

/// Cookie value when all cookies were accepted.
pub const ACCEPTED: &str = "true";
/// Cookie value when only necessary cookies were accepted.
pub const DECLINED: &str = "false";

/// Capabilities the widget runs against.
#[derive(Clone)]
pub struct WidgetServices {
    pub cookies: Arc<dyn CookieStorage>,
    pub page: Arc<dyn Page>,
    pub presentation: Arc<dyn Presentation>,
    pub data_layer: Arc<dyn DataLayer>,
}

impl WidgetServices {
    /// Services with a no-op data layer.
    pub fn new(
        cookies: Arc<dyn CookieStorage>,
        page: Arc<dyn Page>,
        presentation: Arc<dyn Presentation>,
    ) -> Self {
        Self {
            cookies,
            page,
            presentation,
            data_layer: Arc::new(NullDataLayer),
        }
    }

    pub fn with_data_layer(mut self, data_layer: Arc<dyn DataLayer>) -> Self {
        self.data_layer = data_layer;
        self
    }
}

/// Where the modal is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    /// No container exists yet
    #[default]
    Unmounted,
    /// The container exists with `display: none`
    Hidden,
    /// The container exists with `display: block`
    Visible,
}

#[derive(Debug, Default)]
struct CrossDomainState {
    domains: Vec<String>,
    enabled: bool,
    initialized: bool,
    listening_for_changes: bool,
    rescan_timer: Option<TimerId>,
}

pub struct ConsentWidget {
    resolved: ResolvedConfig,
    markup: ModalMarkup,
    services: WidgetServices,
    modal: ModalState,
    /// Show the modal once the auto-show delay passed
    show_on_load: bool,
    /// `show()` was called before the document was ready
    show_pending: bool,
    ready_seen: bool,
    auto_show_timer: Option<TimerId>,
    cross_domain: CrossDomainState,
}

impl ConsentWidget {
    pub fn new(config: ConsentConfig, services: WidgetServices) -> Self {
        let page_language = match config.language_source {
            LanguageSource::Document => services.page.document_language(),
            LanguageSource::Navigator => services.page.navigator_language(),
        };
        let resolved = ResolvedConfig::resolve(config, page_language.as_deref());
        let markup = ModalMarkup::build(&resolved);
        let domains = resolved.config().cross_domain_domains.clone();

        let mut widget = Self {
            resolved,
            markup,
            services,
            modal: ModalState::Unmounted,
            show_on_load: false,
            show_pending: false,
            ready_seen: false,
            auto_show_timer: None,
            cross_domain: CrossDomainState::default(),
        };

        widget.report_initial_state();

        if widget.services.page.ready_state().is_ready() {
            widget.on_document_ready();
        }

        if !domains.is_empty() {
            widget.enable_cross_domain(domains);
        }

        widget
    }

    /// Builds a widget from a JSON settings object merged onto the defaults.
    pub fn from_settings(settings: &str, services: WidgetServices) -> Result<Self, ConsentError> {
        let config = ConsentConfig::from_settings_str(settings)?;
        Ok(Self::new(config, services))
    }

    pub fn config(&self) -> &ConsentConfig {
        self.resolved.config()
    }

    /// The language the modal is shown in.
    pub fn language(&self) -> &str {
        self.resolved.language()
    }

    pub fn markup(&self) -> &ModalMarkup {
        &self.markup
    }

    pub fn modal_state(&self) -> ModalState {
        self.modal
    }

    /// True when the visitor accepted all cookies.
    pub fn tracking_allowed(&self) -> bool {
        self.decision() == Some(true)
    }

    /// The stored decision: `Some(true)` accepted, `Some(false)` declined, `None` undecided.
    pub fn decision(&self) -> Option<bool> {
        match self.cookie_value().as_deref() {
            Some(ACCEPTED) => Some(true),
            Some(DECLINED) => Some(false),
            _ => None,
        }
    }

    /// Shows the modal, creating it on first use. Deferred until the document is ready.
    pub fn show(&mut self) {
        if !self.services.page.ready_state().is_ready() {
            log::debug!("consent: document not ready, deferring modal");
            self.show_pending = true;
            return;
        }
        self.show_now();
    }

    pub fn hide(&mut self) {
        if self.modal == ModalState::Unmounted {
            return;
        }
        self.services
            .presentation
            .set_display(&self.config().modal_id, Display::None);
        self.modal = ModalState::Hidden;
    }

    /// Accepts all cookies.
    pub fn accept(&mut self) -> Result<(), ConsentError> {
        self.decide(true)
    }

    /// Accepts only the necessary cookies.
    pub fn decline(&mut self) -> Result<(), ConsentError> {
        self.decide(false)
    }

    /// Forgets the decision and shows the modal again.
    pub fn reset(&mut self) -> Result<(), ConsentError> {
        let config = self.resolved.config();
        let removed = self
            .services
            .cookies
            .remove(&config.cookie_name, config.domain.as_deref());
        log::info!("consent: decision reset");

        self.show();
        removed.map_err(ConsentError::Storage)
    }

    /// Handles a callback the host delivers.
    pub fn handle_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::DocumentReady => self.on_document_ready(),
            PageEvent::TimerElapsed(id) => self.on_timer(id),
            PageEvent::ButtonClicked(button) => self.on_button_clicked(button),
            PageEvent::LinkClicked(link) => self.on_link_clicked(link),
            PageEvent::DocumentChanged => self.on_document_changed(),
        }
    }

    fn cookie_value(&self) -> Option<String> {
        self.services.cookies.get(&self.resolved.config().cookie_name)
    }

    fn emit(&self, entry: DataLayerEntry) {
        if let Some(layer) = &self.resolved.config().google_tag_data_layer {
            self.services.data_layer.push(layer, entry);
        }
    }

    fn report_initial_state(&mut self) {
        let value = self.cookie_value();

        if value.is_none() && self.resolved.config().auto_show_modal {
            self.show_on_load = true;
            self.emit(DataLayerEntry::Level(ConsentLevel::Undecided));
            self.emit(DataLayerEntry::event(COOKIE_CONSENT_EVENT, None));
            return;
        }

        match value.as_deref() {
            Some(ACCEPTED) => {
                self.emit(DataLayerEntry::consent(ConsentMode::Default, true));
                self.emit(DataLayerEntry::Level(ConsentLevel::AcceptedAll));
            }
            Some(DECLINED) => {
                self.emit(DataLayerEntry::consent(ConsentMode::Default, false));
                self.emit(DataLayerEntry::Level(ConsentLevel::Declined));
            }
            _ => {}
        }
        self.emit(DataLayerEntry::event(COOKIE_CONSENT_EVENT, None));
    }

    fn decide(&mut self, accepted: bool) -> Result<(), ConsentError> {
        let config = self.resolved.config();
        let cookie = Cookie::consent(
            &config.cookie_name,
            if accepted { ACCEPTED } else { DECLINED },
            config.domain.as_deref(),
            OffsetDateTime::now_utc(),
        );
        let written = self.services.cookies.set(&cookie);
        if let Err(e) = &written {
            log::warn!("consent: cannot store decision: {}", e);
        }

        let level = if accepted { ConsentLevel::AcceptedAll } else { ConsentLevel::Declined };
        self.emit(DataLayerEntry::consent(ConsentMode::Update, accepted));
        self.emit(DataLayerEntry::Level(level));
        self.emit(DataLayerEntry::event(COOKIE_CONSENT_EVENT, Some(level)));
        if !accepted {
            self.emit(DataLayerEntry::event(REVOKE_COOKIE_CONSENT_EVENT, Some(ConsentLevel::Declined)));
        }

        log::info!(
            "consent: visitor {} tracking",
            if accepted { "accepted" } else { "declined" }
        );

        self.hide();
        written.map_err(ConsentError::Storage)
    }

    fn show_now(&mut self) {
        let presentation = self.services.presentation.clone();
        let modal_id = self.resolved.config().modal_id.clone();

        if self.modal != ModalState::Unmounted || presentation.has_element(&modal_id) {
            presentation.set_display(&modal_id, Display::Block);
            self.modal = ModalState::Visible;
            return;
        }

        if let Err(e) = presentation.mount(&modal_id, &self.markup) {
            log::error!("consent: cannot mount modal '{}': {}", modal_id, e);
            return;
        }
        presentation.bind_buttons(&modal_id);
        self.modal = ModalState::Visible;
        log::debug!("consent: modal '{}' mounted", modal_id);
    }

    fn on_document_ready(&mut self) {
        if !self.ready_seen {
            self.ready_seen = true;
            if self.show_on_load {
                let delay = self.resolved.config().auto_show_delay();
                self.auto_show_timer = Some(self.services.page.set_timeout(delay));
            }
        }

        if self.cross_domain.enabled && !self.cross_domain.initialized {
            self.init_cross_domain();
        }

        if self.show_pending {
            self.show_pending = false;
            self.show_now();
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.auto_show_timer == Some(id) {
            self.auto_show_timer = None;
            if self.show_on_load {
                self.show();
            }
        } else if self.cross_domain.rescan_timer == Some(id) {
            self.scan_links();
        }
    }

    fn on_button_clicked(&mut self, button: ConsentButton) {
        let accepted = button == ConsentButton::AcceptAll;
        // a failed cookie write is already logged by `decide`
        let _ = self.decide(accepted);

        if let Some(callback) = self.resolved.config().post_selection_callback.clone() {
            callback.call(accepted);
            self.hide();
        }
    }
}
