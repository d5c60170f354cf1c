#![no_main]

use libfuzzer_sys::fuzz_target;
use rendimiento::classify::ClassifierRegistry;
use rendimiento::resolve::AliasTable;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (Ok(table), Ok(rules)) = (AliasTable::default_table(), ClassifierRegistry::default_rules())
    else {
        return;
    };

    // Raw bytes as an embedded JSON string payload, and as a parsed payload
    let as_string = Value::String(input.to_string());
    let parsed = serde_json::from_str::<Value>(input).ok();

    for id in table.ids() {
        for payload in std::iter::once(&as_string).chain(parsed.as_ref()) {
            if let Some(resolved) = table.resolve_value(payload, id) {
                assert!(resolved.value.is_finite());
            }
        }
    }

    // Classification must never fail on arbitrary labels
    let _ = rules.classify(input, Some(input));
});
