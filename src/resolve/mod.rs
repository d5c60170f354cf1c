// Metric Key Resolution
//
// Extracts a canonical metric value from a device payload whose key naming
// drifts between firmware versions. Two explicit stages:
//
//   1. `FlatPayload` merges known nested containers ("results",
//      "resultFields", "summary", ...) into one namespace, later containers
//      overriding earlier ones.
//   2. `resolve_aliases` scans the metric's alias list in priority order and
//      returns the first value passing the metric's validity predicate.
//
// A missing, malformed or invalid value is `None`, never a zero stand-in.

mod alias;
mod payload;

pub use alias::{AliasTable, CanonicalMetric, CompositeMetric, MetricRef, Validity};
pub use payload::{FlatPayload, DEFAULT_CONTAINERS};

use serde::Serialize;

/// A successfully resolved metric value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub metric_id: String,
    pub value: f64,

    /// Payload key that supplied the value; `None` for composites
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// First alias hit: the value and the key that held it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasHit<'a> {
    pub value: f64,
    pub key: &'a str,
}

/// Return the first alias whose value passes `validity`
///
/// Aliases are tried strictly in order. An alias that is present but invalid
/// (zero, negative, non-numeric) does not stop the scan.
pub fn resolve_aliases<'a, S: AsRef<str>>(
    payload: &FlatPayload,
    aliases: &'a [S],
    validity: Validity,
) -> Option<AliasHit<'a>> {
    aliases.iter().find_map(|alias| {
        let key = alias.as_ref();
        payload
            .number(key)
            .filter(|v| validity.accepts(*v))
            .map(|value| AliasHit { value, key })
    })
}
