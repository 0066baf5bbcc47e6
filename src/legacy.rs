//! The layouts of older Gecko profile versions.
//!
//! Each upgrade step consumes one of these shapes and produces the next one,
//! so a step can't be skipped without the types disagreeing:
//!
//!  - [`ProfileV3`]: `libs` is a JSON string, sub-process profiles are JSON
//!    strings inside `threads`, and threads may lack a `processType`.
//!  - [`ProfileV4`]: `libs` is an array sorted by start address; sub-process
//!    profiles are still JSON strings inside `threads`.
//!  - [`ProfileV5`]: versions 5 to 7. Sub-process profiles live in
//!    `processes`. Versions 6 and 7 only differ in table contents.
//!  - [`Profile`](crate::Profile): version 8 and up.

use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::columnar_table::ColumnarTable;
use crate::profile::{Lib, ProcessType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMeta {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileV3 {
    pub meta: LegacyMeta,
    /// A JSON-encoded array of [`LegacyLib`]s.
    pub libs: String,
    pub threads: Vec<ThreadEntryV3>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreadEntryV3 {
    /// A JSON-encoded [`ProfileV3`] of a child process.
    Subprocess(String),
    Thread(ThreadV3),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadV3 {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_type: Option<ProcessType>,
    pub samples: ColumnarTable,
    pub markers: ColumnarTable,
    pub string_table: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A library as it was described before version 4.
///
/// Libraries on Windows were identified by their PDB (`pdbName`,
/// `pdbSignature`, `pdbAge`), everything else had a `breakpadId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyLib {
    pub name: String,
    #[serde(default)]
    pub breakpad_id: Option<String>,
    #[serde(default)]
    pub pdb_name: Option<String>,
    #[serde(default)]
    pub pdb_signature: Option<String>,
    #[serde(default)]
    pub pdb_age: Option<u32>,
    pub start: u64,
    pub end: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileV4 {
    pub meta: LegacyMeta,
    pub libs: Vec<Lib>,
    pub threads: Vec<ThreadEntryV4>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreadEntryV4 {
    /// A JSON-encoded [`ProfileV4`] of a child process.
    Subprocess(String),
    Thread(ThreadV4),
}

/// The thread layout of versions 4 to 7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadV4 {
    pub name: String,
    pub process_type: ProcessType,
    pub samples: ColumnarTable,
    pub markers: ColumnarTable,
    pub string_table: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileV5 {
    pub meta: LegacyMeta,
    pub libs: Vec<Lib>,
    pub threads: Vec<ThreadV4>,
    #[serde(default)]
    pub processes: Vec<ProfileV5>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
