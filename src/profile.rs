use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::columnar_table::ColumnarTable;

/// A Gecko profile in the current format (version 8 and up), or one of its
/// nested sub-process profiles.
///
/// Fields that this crate doesn't need to understand are kept in `extra`
/// and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub meta: Meta,
    pub libs: Vec<Lib>,
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub processes: Vec<Profile>,
    pub paused_ranges: Vec<PausedRange>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
    /// Milliseconds since `meta.startTime`, or `None` if the process was
    /// still running when the profile was captured.
    pub shutdown_time: Option<Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lib {
    pub name: String,
    pub path: String,
    pub debug_name: String,
    #[serde(default)]
    pub debug_path: String,
    pub breakpad_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    pub start: u64,
    pub end: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub name: String,
    pub process_type: ProcessType,
    /// Milliseconds since `meta.startTime`. Times keep the number
    /// representation they were read with.
    pub register_time: Number,
    pub unregister_time: Option<Number>,
    pub samples: ColumnarTable,
    pub markers: ColumnarTable,
    pub string_table: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedRange {
    pub start_time: Option<Number>,
    pub end_time: Option<Number>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessType {
    Default,
    Tab,
    Plugin,
    Other(String),
}

impl From<String> for ProcessType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "default" => ProcessType::Default,
            "tab" => ProcessType::Tab,
            "plugin" => ProcessType::Plugin,
            _ => ProcessType::Other(s),
        }
    }
}

impl From<ProcessType> for String {
    fn from(process_type: ProcessType) -> Self {
        match process_type {
            ProcessType::Default => "default".to_string(),
            ProcessType::Tab => "tab".to_string(),
            ProcessType::Plugin => "plugin".to_string(),
            ProcessType::Other(s) => s,
        }
    }
}
