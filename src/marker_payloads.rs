//! Per-type conversions of marker payloads (the objects in the `data`
//! column of a thread's markers table) between format versions.

use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MalformedError;

/// A marker payload, classified by its `type` tag.
///
/// Only the payload types whose layout changed between versions get their
/// own variant; everything else passes through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerPayload {
    GcMinor(GcMinorPayload),
    GcMajor(GcMajorPayload),
    DomEvent(DomEventPayload),
    Other(Value),
}

impl MarkerPayload {
    /// Classifies a payload in the version 7+ layout.
    ///
    /// GC payloads without a `nursery` or `timings` object have nothing to
    /// convert and are kept as `Other`, so a `null` there stays `null`.
    pub fn classify(payload: Value) -> Result<Self, MalformedError> {
        let payload_type = payload.get("type").and_then(Value::as_str);
        let has_object = |key: &str| payload.get(key).map_or(false, Value::is_object);
        Ok(match payload_type {
            Some("GCMinor") if has_object("nursery") => {
                MarkerPayload::GcMinor(serde_json::from_value(payload)?)
            }
            Some("GCMajor") if has_object("timings") => {
                MarkerPayload::GcMajor(serde_json::from_value(payload)?)
            }
            Some("DOMEvent") => match payload {
                Value::Object(mut rest) => MarkerPayload::DomEvent(DomEventPayload {
                    event_type: rest.remove("eventType"),
                    rest,
                }),
                other => MarkerPayload::Other(other),
            },
            _ => MarkerPayload::Other(payload),
        })
    }

    /// Before version 7, the payload of a marker named `DOMEvent` carried
    /// the DOM event type in `type`. The marker name decides this, not the
    /// payload, so the caller has to know that `payload` belongs to one.
    pub fn from_gecko_6_dom_event(payload: Value) -> Result<Self, MalformedError> {
        let Value::Object(mut rest) = payload else {
            return Err(MalformedError::UnexpectedCellType {
                column: "data".to_string(),
                expected: "a DOMEvent payload object",
            });
        };
        // An eventType left over from a partial conversion is replaced.
        rest.remove("eventType");
        let event_type = rest.remove("type");
        rest.insert("type".to_string(), Value::from("DOMEvent"));
        Ok(MarkerPayload::DomEvent(DomEventPayload { event_type, rest }))
    }

    /// The Gecko format 8 -> 9 conversion. Payloads that are already in the
    /// version 9 layout are left as they are.
    pub fn upgrade_gecko_8_to_9(self) -> Self {
        match self {
            MarkerPayload::GcMinor(payload) => {
                MarkerPayload::GcMinor(payload.upgrade_gecko_8_to_9())
            }
            MarkerPayload::GcMajor(payload) => {
                MarkerPayload::GcMajor(payload.upgrade_gecko_8_to_9())
            }
            other => other,
        }
    }

    pub fn into_value(self) -> Result<Value, MalformedError> {
        Ok(match self {
            MarkerPayload::GcMinor(payload) => serde_json::to_value(payload)?,
            MarkerPayload::GcMajor(payload) => serde_json::to_value(payload)?,
            MarkerPayload::DomEvent(payload) => serde_json::to_value(payload)?,
            MarkerPayload::Other(value) => value,
        })
    }
}

/// Runs the 8 -> 9 conversion on a raw payload cell.
pub fn upgrade_marker_payload_gecko_8_to_9(payload: Value) -> Result<Value, MalformedError> {
    MarkerPayload::classify(payload)?
        .upgrade_gecko_8_to_9()
        .into_value()
}

/// The Gecko format 6 -> 7 conversion for payloads of markers named
/// `DOMEvent`: the DOM event type moves from `type` to `eventType`, and
/// `type` becomes the marker type.
pub fn upgrade_dom_event_payload_gecko_6_to_7(payload: Value) -> Result<Value, MalformedError> {
    MarkerPayload::from_gecko_6_dom_event(payload)?.into_value()
}

/// `rest` holds the `type` tag along with all other fields. A `null`
/// event type is `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomEventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcMinorPayload {
    pub nursery: Nursery,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nursery {
    WithStatus(NurseryWithStatus),
    Legacy(LegacyNursery),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurseryWithStatus {
    pub status: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// The nursery layout before `status` existed. Fields other than the
/// renamed ones (`promotion_rate`, `reason`, ...) are kept so the raw data
/// stays inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyNursery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nursery_bytes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_nursery_bytes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl GcMinorPayload {
    pub fn upgrade_gecko_8_to_9(self) -> Self {
        let nursery = match self.nursery {
            Nursery::WithStatus(mut nursery) => {
                if nursery.status == "no collection" {
                    nursery.status = "nursery empty".to_string();
                }
                Nursery::WithStatus(nursery)
            }
            Nursery::Legacy(legacy) => {
                let mut rest = legacy.rest;
                // cur_capacity has no counterpart in the old layout.
                let renames = [
                    ("bytes_used", legacy.nursery_bytes),
                    ("new_capacity", legacy.new_nursery_bytes),
                    ("phase_times", legacy.timings),
                ];
                for (key, value) in renames {
                    if let Some(value) = value {
                        rest.insert(key.to_string(), value);
                    }
                }
                Nursery::WithStatus(NurseryWithStatus {
                    status: "complete".to_string(),
                    rest,
                })
            }
        };
        GcMinorPayload {
            nursery,
            rest: self.rest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcMajorPayload {
    pub timings: GcMajorTimings,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GcMajorTimings {
    WithStatus(GcMajorTimingsWithStatus),
    Legacy(LegacyGcMajorTimings),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcMajorTimingsWithStatus {
    pub status: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `allocated` is in MiB, the `mmu_*` fields are percentages and the
/// `totals` phase times are in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyGcMajorTimings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmu_20ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmu_50ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl GcMajorPayload {
    pub fn upgrade_gecko_8_to_9(self) -> Self {
        let timings = match self.timings {
            GcMajorTimings::Legacy(legacy) => {
                GcMajorTimings::WithStatus(legacy.into_timings_with_status())
            }
            already_upgraded => already_upgraded,
        };
        GcMajorPayload {
            timings,
            rest: self.rest,
        }
    }
}

impl LegacyGcMajorTimings {
    fn into_timings_with_status(self) -> GcMajorTimingsWithStatus {
        let mut rest = self.rest;
        if let Some(allocated_mib) = self.allocated {
            let allocated_bytes = (allocated_mib * 1024.0 * 1024.0).round() as u64;
            rest.insert("allocated_bytes".to_string(), allocated_bytes.into());
        }
        for (key, percent) in [("mmu_20ms", self.mmu_20ms), ("mmu_50ms", self.mmu_50ms)] {
            if let Some(percent) = percent {
                rest.insert(key.to_string(), (percent / 100.0).into());
            }
        }
        if let Some(totals) = self.totals {
            let phase_times: Map<String, Value> = totals
                .into_iter()
                .map(|(phase, time)| match time.as_f64() {
                    Some(us) => (phase, Value::from(us / 1000.0)),
                    None => (phase, time),
                })
                .collect();
            rest.insert("phase_times".to_string(), Value::Object(phase_times));
        }
        GcMajorTimingsWithStatus {
            status: "completed".to_string(),
            rest,
        }
    }
}
