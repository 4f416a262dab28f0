#![allow(dead_code)]

use cookie_consent::config::ConsentConfig;
use cookie_consent::cookies::{Cookie, CookieStorage, DocumentCookieJar};
use cookie_consent::datalayer::InMemoryDataLayer;
use cookie_consent::headless::HeadlessDocument;
use cookie_consent::page::PageEvent;
use cookie_consent::{ConsentWidget, WidgetServices};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// A headless page with its cookie jar and data layer.
pub struct TestEnv {
    pub doc: Arc<HeadlessDocument>,
    pub jar: Arc<DocumentCookieJar>,
    pub layer: Arc<InMemoryDataLayer>,
}

impl TestEnv {
    pub fn new(location: &str) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        Self {
            doc: Arc::new(HeadlessDocument::new(location.parse().expect("valid test URL"))),
            jar: Arc::new(DocumentCookieJar::new()),
            layer: Arc::new(InMemoryDataLayer::new()),
        }
    }

    pub fn services(&self) -> WidgetServices {
        WidgetServices::new(self.jar.clone(), self.doc.clone(), self.doc.clone()).with_data_layer(self.layer.clone())
    }

    pub fn widget(&self, config: ConsentConfig) -> ConsentWidget {
        ConsentWidget::new(config, self.services())
    }

    /// Stores a consent decision as if it was made on an earlier visit.
    pub fn remember(&self, name: &str, value: &str) {
        self.jar
            .set(&Cookie::consent(name, value, None, OffsetDateTime::now_utc()))
            .expect("store cookie");
    }

    pub fn dispatch(&self, widget: &mut ConsentWidget, events: impl IntoIterator<Item = PageEvent>) {
        for event in events {
            widget.handle_event(event);
        }
    }

    /// Fires document ready and lets the auto-show delay pass.
    pub fn load_and_settle(&self, widget: &mut ConsentWidget) {
        widget.handle_event(self.doc.load());
        let fired = self.doc.advance(Duration::from_millis(10));
        self.dispatch(widget, fired);
    }
}
