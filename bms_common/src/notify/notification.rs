use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event kinds emitted by the inventory handlers.
pub mod kinds {
    /// A new article was added to the inventory.
    pub const ARTICLE_CREATED: &str = "article_created";
    /// An existing article was edited.
    pub const ARTICLE_UPDATED: &str = "article_updated";
    /// A post-it note was pinned.
    pub const POSTIT_CREATED: &str = "postit_created";
    /// A user acknowledged a post-it note.
    pub const POSTIT_CHECKED: &str = "postit_checked";
    /// A post-it note was removed.
    pub const POSTIT_DELETED: &str = "postit_deleted";
    /// A calendar entry was created.
    pub const AGENDA_CREATED: &str = "agenda_created";
}

/// # Notification
///
/// A tagged change record. Serialized as `{"type": "<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// What happened, e.g. `article_created`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Details of the change.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Notification {
    /// Builds a notification from a kind and a JSON payload.
    ///
    /// Objects are used as-is, `null` becomes an empty mapping, and any other
    /// value is wrapped as `{"value": ...}` so `data` is always a mapping.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Serializes the notification to its wire text.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
