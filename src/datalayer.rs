//! Analytics data layer.
//!
//! The widget reports consent to tag managers by pushing [`DataLayerEntry`]
//! values onto a named sink (`dataLayer` by default). The sink is injected as
//! a [`DataLayer`] implementation; [`NullDataLayer`] discards everything and
//! [`InMemoryDataLayer`] records the entries per layer name.
//!
//! Entries render to the JSON shapes tag managers understand:
//!
//! | entry | JSON |
//! |---|---|
//! | consent command | `["consent", "update", {"ad_storage": "granted", "analytics_storage": "granted"}]` |
//! | consent level | `{"cookie_consent": 2}` |
//! | event | `{"event": "cookie_consent", "value": 2}` |

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Event name pushed for every consent state report.
pub const COOKIE_CONSENT_EVENT: &str = "cookie_consent";
/// Event name pushed when the visitor declines.
pub const REVOKE_COOKIE_CONSENT_EVENT: &str = "revoke_cookie_consent";

/// Whether a consent command sets the default state or updates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentMode {
    Default,
    Update,
}

impl ConsentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentMode::Default => "default",
            ConsentMode::Update => "update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageGrant {
    Granted,
    Denied,
}

impl StorageGrant {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageGrant::Granted => "granted",
            StorageGrant::Denied => "denied",
        }
    }
}

/// Numeric consent level reported as `cookie_consent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentLevel {
    /// No decision yet (`-1`)
    Undecided,
    /// Only necessary cookies (`0`)
    Declined,
    /// All cookies (`2`)
    AcceptedAll,
}

impl ConsentLevel {
    pub fn value(&self) -> i8 {
        match self {
            ConsentLevel::Undecided => -1,
            ConsentLevel::Declined => 0,
            ConsentLevel::AcceptedAll => 2,
        }
    }
}

/// One record pushed onto the data layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayerEntry {
    /// A `("consent", mode, {...})` command; both storages share the same grant.
    Consent { mode: ConsentMode, grant: StorageGrant },
    /// `{cookie_consent: level}`
    Level(ConsentLevel),
    /// `{event: name[, value]}`
    Event { name: &'static str, value: Option<i8> },
}

impl DataLayerEntry {
    pub fn consent(mode: ConsentMode, granted: bool) -> Self {
        let grant = if granted { StorageGrant::Granted } else { StorageGrant::Denied };
        DataLayerEntry::Consent { mode, grant }
    }

    pub fn event(name: &'static str, value: Option<ConsentLevel>) -> Self {
        DataLayerEntry::Event {
            name,
            value: value.map(|v| v.value()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            DataLayerEntry::Consent { mode, grant } => json!([
                "consent",
                mode.as_str(),
                {
                    "ad_storage": grant.as_str(),
                    "analytics_storage": grant.as_str(),
                }
            ]),
            DataLayerEntry::Level(level) => json!({ "cookie_consent": level.value() }),
            DataLayerEntry::Event { name, value: None } => json!({ "event": name }),
            DataLayerEntry::Event { name, value: Some(value) } => json!({ "event": name, "value": value }),
        }
    }
}

impl Serialize for DataLayerEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Sink for data-layer entries.
pub trait DataLayer: Send + Sync {
    /// Appends `entry` to the data layer called `layer`, creating it if needed.
    fn push(&self, layer: &str, entry: DataLayerEntry);
}

/// Discards all entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDataLayer;

impl DataLayer for NullDataLayer {
    fn push(&self, _layer: &str, _entry: DataLayerEntry) {}
}

/// Keeps every pushed entry in memory, per layer name.
#[derive(Debug, Default)]
pub struct InMemoryDataLayer {
    layers: Mutex<HashMap<String, Vec<DataLayerEntry>>>,
}

impl InMemoryDataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries pushed onto `layer`, oldest first.
    pub fn entries(&self, layer: &str) -> Vec<DataLayerEntry> {
        self.layers
            .lock()
            .map(|layers| layers.get(layer).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// The entries of `layer` rendered as JSON.
    pub fn to_json(&self, layer: &str) -> Value {
        Value::Array(self.entries(layer).iter().map(DataLayerEntry::to_json).collect())
    }

    /// Names of all layers that received at least one entry.
    pub fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .layers
            .lock()
            .map(|layers| layers.keys().cloned().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn clear(&self) {
        if let Ok(mut layers) = self.layers.lock() {
            layers.clear();
        }
    }
}

impl DataLayer for InMemoryDataLayer {
    fn push(&self, layer: &str, entry: DataLayerEntry) {
        if let Ok(mut layers) = self.layers.lock() {
            layers.entry(layer.to_string()).or_default().push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shapes() {
        assert_eq!(
            DataLayerEntry::consent(ConsentMode::Update, true).to_json(),
            json!(["consent", "update", { "ad_storage": "granted", "analytics_storage": "granted" }])
        );
        assert_eq!(
            DataLayerEntry::consent(ConsentMode::Default, false).to_json(),
            json!(["consent", "default", { "ad_storage": "denied", "analytics_storage": "denied" }])
        );
        assert_eq!(
            DataLayerEntry::Level(ConsentLevel::Undecided).to_json(),
            json!({ "cookie_consent": -1 })
        );
        assert_eq!(
            DataLayerEntry::event(COOKIE_CONSENT_EVENT, None).to_json(),
            json!({ "event": "cookie_consent" })
        );
        assert_eq!(
            DataLayerEntry::event(REVOKE_COOKIE_CONSENT_EVENT, Some(ConsentLevel::Declined)).to_json(),
            json!({ "event": "revoke_cookie_consent", "value": 0 })
        );
    }

    #[test]
    fn serializes_like_to_json() {
        let entry = DataLayerEntry::Level(ConsentLevel::AcceptedAll);
        assert_eq!(serde_json::to_string(&entry).unwrap(), r#"{"cookie_consent":2}"#);
    }

    #[test]
    fn in_memory_layers_are_created_on_first_push() {
        let sink = InMemoryDataLayer::new();
        assert!(sink.entries("dataLayer").is_empty());

        sink.push("dataLayer", DataLayerEntry::Level(ConsentLevel::Declined));
        sink.push("other", DataLayerEntry::Level(ConsentLevel::AcceptedAll));
        sink.push("dataLayer", DataLayerEntry::event(COOKIE_CONSENT_EVENT, None));

        assert_eq!(sink.layer_names(), vec!["dataLayer".to_string(), "other".to_string()]);
        assert_eq!(
            sink.to_json("dataLayer"),
            json!([{ "cookie_consent": 0 }, { "event": "cookie_consent" }])
        );

        sink.clear();
        assert!(sink.layer_names().is_empty());
    }
}
