// Device/Test Classification
//
// Maps a raw, device-specific test-type label (plus an optional sub-test
// name) onto a canonical device family and test category.
//
// Classification is data-driven: an ordered rule pack loaded from TOML.
// Resolution order is fixed:
//   1. explicit category table (first matching entry wins)
//   2. ordered keyword heuristics (substring match on the normalized label)
//   3. the pack's default family
//
// Classification never fails. The worst outcome is the coarse default.

mod definition;
mod registry;

pub use definition::{
    normalize_label, CategoryRule, Classification, DeviceFamily, KeywordRule, MatchSource,
};
pub use registry::ClassifierRegistry;
