// Payload flattening: the first stage of metric resolution
//
// Device payloads arrive in several shapes: a flat object, an object with
// nested result containers, or the same thing JSON-encoded as a string.
// Flattening merges the known containers into one lookup namespace so that
// alias resolution only ever deals with `key → scalar`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Container precedence used when an alias table does not declare its own
pub const DEFAULT_CONTAINERS: [&str; 4] =
    ["results", "resultFields", "summary", "runningSummaryFields"];

/// Keys that name an entry inside a result-field array
const ENTRY_NAME_KEYS: [&str; 3] = ["name", "key", "resultName"];

/// Single-level lookup namespace built from an arbitrary payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatPayload {
    fields: BTreeMap<String, Value>,
}

impl FlatPayload {
    /// Flatten a payload using the given container precedence
    ///
    /// Top-level keys are inserted first, then each container in order;
    /// later containers override earlier ones. Returns `None` when the
    /// payload is not an object (or a string that parses into one).
    pub fn from_value<S: AsRef<str>>(payload: &Value, containers: &[S]) -> Option<Self> {
        let parsed;
        let object = match payload {
            Value::Object(map) => map,
            Value::String(text) => {
                parsed = parse_embedded(text)?;
                &parsed
            }
            Value::Null => return None,
            other => {
                tracing::debug!("Ignoring non-object metrics payload: {}", type_name(other));
                return None;
            }
        };

        let container_names: Vec<&str> = containers.iter().map(AsRef::as_ref).collect();
        let mut fields = BTreeMap::new();

        for (key, value) in object {
            if container_names.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }

        for name in &container_names {
            match object.get(*name) {
                Some(Value::Object(inner)) => merge_object(&mut fields, inner),
                Some(Value::Array(entries)) => merge_entries(&mut fields, entries),
                Some(Value::String(text)) => {
                    if let Some(inner) = parse_embedded(text) {
                        merge_object(&mut fields, &inner);
                    }
                }
                _ => {}
            }
        }

        Some(Self { fields })
    }

    /// Flatten with the default container precedence
    pub fn from_default(payload: &Value) -> Option<Self> {
        Self::from_value(payload, &DEFAULT_CONTAINERS)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric view of a field
    ///
    /// Accepts JSON numbers and strings holding a finite number. Anything
    /// else, including NaN/infinite parses, is `None`.
    pub fn number(&self, key: &str) -> Option<f64> {
        let value = match self.fields.get(key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

fn parse_embedded(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            tracing::debug!(
                "Embedded metrics payload is not an object: {}",
                type_name(&other)
            );
            None
        }
        Err(e) => {
            tracing::debug!("Failed to parse embedded metrics payload: {}", e);
            None
        }
    }
}

fn merge_object(fields: &mut BTreeMap<String, Value>, inner: &Map<String, Value>) {
    for (key, value) in inner {
        fields.insert(key.clone(), value.clone());
    }
}

/// Flatten `[{"name": "JUMP_HEIGHT", "value": 35.1}, ...]` style containers
fn merge_entries(fields: &mut BTreeMap<String, Value>, entries: &[Value]) {
    for entry in entries {
        let Value::Object(obj) = entry else {
            continue;
        };
        let name = ENTRY_NAME_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str));
        if let (Some(name), Some(value)) = (name, obj.get("value")) {
            fields.insert(name.to_string(), value.clone());
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
