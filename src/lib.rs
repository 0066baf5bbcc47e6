//! This crate upgrades profiles in the [Gecko profile format] to the current
//! version of that format.
//!
//! The Gecko profile format is the JSON format that Firefox's built-in
//! profiler produces. Its layout has changed over time, and every profile
//! carries its format version in `meta.version`. Old captures can still be
//! loaded by converting them one version at a time until they reach
//! [`CURRENT_VERSION`]. Sub-process profiles nested inside a profile are
//! converted along with it.
//!
//! The caller is responsible for reading and decoding the profile; this
//! crate works on a decoded [`serde_json::Value`].
//!
//! [Gecko profile format]: https://github.com/firefox-devtools/profiler/blob/main/docs-developer/gecko-profile-format.md
//!
//! ## Example
//!
//! ```
//! use gecko_profile_versioning::{upgrade_gecko_profile_to_current_version, CURRENT_VERSION};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), gecko_profile_versioning::Error> {
//! let mut profile = json!({
//!     "meta": { "version": 7, "startTime": 1500000000000.0 },
//!     "libs": [],
//!     "threads": [],
//!     "processes": []
//! });
//! upgrade_gecko_profile_to_current_version(&mut profile)?;
//! assert_eq!(profile["meta"]["version"], CURRENT_VERSION);
//! assert_eq!(profile["pausedRanges"], json!([]));
//! # Ok(())
//! # }
//! ```

mod columnar_table;
mod error;
mod fast_hash_map;
mod legacy;
mod marker_payloads;
mod process_tree;
mod profile;
mod string_table;
mod upgraders;
mod versioning;

pub use columnar_table::ColumnarTable;
pub use error::{Error, MalformedError, Result};
pub use marker_payloads::{
    upgrade_dom_event_payload_gecko_6_to_7, upgrade_marker_payload_gecko_8_to_9, DomEventPayload,
    GcMajorPayload, GcMajorTimings, GcMajorTimingsWithStatus, GcMinorPayload, LegacyGcMajorTimings,
    LegacyNursery, MarkerPayload, Nursery, NurseryWithStatus,
};
pub use profile::{Lib, Meta, PausedRange, ProcessType, Profile, Thread};
pub use string_table::StringTable;
pub use versioning::{
    gecko_profile_version, upgrade_gecko_profile_json, upgrade_gecko_profile_to_current_version,
    CURRENT_VERSION,
};

/// The typed layouts of older format versions, and the individual upgrade
/// steps between them.
pub mod legacy_formats {
    pub use crate::legacy::*;
    pub use crate::upgraders::{
        upgrade_to_v4, upgrade_to_v5, upgrade_to_v6, upgrade_to_v7, upgrade_to_v8, upgrade_to_v9,
    };
}
