// Copyright 2025 Agentgate Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Protocol card documents.
//!
//! A card is a capability descriptor owned by its protocol, not by the
//! registry. The registry keeps it as JSON and only reads a handful of
//! conventionally named fields through the extractors in
//! [`crate::capability`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Key under which unparseable card content is surfaced.
pub const RAW_KEY: &str = "raw";

/// A card document as stored.
#[derive(Debug, Clone, PartialEq)]
pub enum CardDocument {
    /// A JSON object.
    Structured(Map<String, Value>),
    /// Anything that is not a JSON object: malformed text, arrays, scalars.
    /// Serialized as `{"raw": <value>}`.
    RawOpaque(Value),
}

impl CardDocument {
    /// Coerce a loosely-typed value into a card document.
    ///
    /// Objects are kept as-is. Strings are parsed as JSON; a string that does
    /// not parse keeps its original text under `raw`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => CardDocument::Structured(map),
            Value::String(text) => Self::from_stored(&text),
            other => CardDocument::RawOpaque(other),
        }
    }

    /// Parse a card document from its stored text.
    pub fn from_stored(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => CardDocument::Structured(map),
            Ok(other) => CardDocument::RawOpaque(other),
            Err(_) => CardDocument::RawOpaque(Value::String(text.to_string())),
        }
    }

    /// Fields of a structured document, `None` for opaque content.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            CardDocument::Structured(map) => Some(map),
            CardDocument::RawOpaque(_) => None,
        }
    }

    /// Look up a top-level field. Opaque documents have no fields.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields().and_then(|map| map.get(key))
    }

    /// Set a top-level field, turning an opaque document into a structured
    /// one that keeps the opaque content under `raw`.
    pub fn set_field(&mut self, key: &str, value: Value) {
        if let CardDocument::RawOpaque(raw) = self {
            let mut map = Map::new();
            map.insert(RAW_KEY.to_string(), std::mem::take(raw));
            *self = CardDocument::Structured(map);
        }
        if let CardDocument::Structured(map) = self {
            map.insert(key.to_string(), value);
        }
    }

    /// Set a top-level field only when it is absent or null.
    pub fn set_default(&mut self, key: &str, value: Value) {
        let missing = matches!(self.field(key), None | Some(Value::Null));
        if missing {
            self.set_field(key, value);
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, CardDocument::Structured(_))
    }

    /// JSON form, with opaque content wrapped as `{"raw": ...}`.
    pub fn to_value(&self) -> Value {
        match self {
            CardDocument::Structured(map) => Value::Object(map.clone()),
            CardDocument::RawOpaque(raw) => {
                let mut map = Map::new();
                map.insert(RAW_KEY.to_string(), raw.clone());
                Value::Object(map)
            }
        }
    }

    /// Text persisted in the card table. [`CardDocument::from_stored`] reads
    /// it back unchanged: malformed text is kept verbatim, and text that
    /// happens to be valid JSON is stored as a JSON string.
    pub fn to_stored(&self) -> String {
        match self {
            CardDocument::Structured(map) => Value::Object(map.clone()).to_string(),
            CardDocument::RawOpaque(Value::String(text))
                if serde_json::from_str::<Value>(text).is_err() =>
            {
                text.clone()
            }
            CardDocument::RawOpaque(raw) => raw.to_string(),
        }
    }
}

impl Default for CardDocument {
    fn default() -> Self {
        CardDocument::Structured(Map::new())
    }
}

impl From<Value> for CardDocument {
    fn from(value: Value) -> Self {
        CardDocument::from_value(value)
    }
}

impl Serialize for CardDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CardDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(CardDocument::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_text_is_wrapped() {
        let doc = CardDocument::from_stored("{not json");
        assert_eq!(doc.to_value(), json!({"raw": "{not json"}));
        assert_eq!(doc.to_stored(), "{not json");
    }

    #[test]
    fn test_json_string_is_parsed() {
        let doc = CardDocument::from_value(json!("{\"name\": \"Agent One\"}"));
        assert_eq!(doc.field("name"), Some(&json!("Agent One")));
    }

    #[test]
    fn test_non_object_json_is_opaque() {
        let doc = CardDocument::from_stored("[1, 2]");
        assert!(!doc.is_structured());
        assert_eq!(doc.to_value(), json!({"raw": [1, 2]}));
        assert_eq!(doc.field("name"), None);
    }

    #[test]
    fn test_stored_text_reads_back_unchanged() {
        let docs = [
            CardDocument::from_value(json!({"name": "Agent One"})),
            CardDocument::RawOpaque(json!("123")),
            CardDocument::RawOpaque(json!("{oops")),
            CardDocument::RawOpaque(json!([1, 2])),
            CardDocument::RawOpaque(json!(7)),
        ];
        for doc in docs {
            assert_eq!(CardDocument::from_stored(&doc.to_stored()), doc);
        }
        assert_eq!(CardDocument::RawOpaque(json!("123")).to_stored(), "\"123\"");
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut doc = CardDocument::from_value(json!({"agentVersion": "v1"}));
        doc.set_default("agentVersion", json!("v9"));
        doc.set_default("humanReadableId", json!("agent-x"));
        assert_eq!(doc.field("agentVersion"), Some(&json!("v1")));
        assert_eq!(doc.field("humanReadableId"), Some(&json!("agent-x")));
    }

    #[test]
    fn test_set_field_on_opaque_keeps_raw() {
        let mut doc = CardDocument::from_stored("garbage");
        doc.set_field("agentVersion", json!("v2"));
        assert_eq!(doc.to_value(), json!({"raw": "garbage", "agentVersion": "v2"}));
    }
}
