//! One function per format version: `upgrade_to_vN` converts a profile of
//! version N - 1 into a profile of version N, including all of its nested
//! sub-process profiles. None of them touch `meta.version`; that's the
//! driver's job.

use serde_json::{Number, Value};

use crate::columnar_table::ColumnarTable;
use crate::error::MalformedError;
use crate::legacy::{
    LegacyLib, LegacyMeta, ProfileV3, ProfileV4, ProfileV5, ThreadEntryV3, ThreadEntryV4,
    ThreadV3, ThreadV4,
};
use crate::marker_payloads::{
    upgrade_dom_event_payload_gecko_6_to_7, upgrade_marker_payload_gecko_8_to_9,
};
use crate::process_tree::{convert_process_tree, for_each_process_mut};
use crate::profile::{Lib, Meta, ProcessType, Profile, Thread};
use crate::string_table::StringTable;

/// Version 4 turned `libs` from a JSON string into a sorted array of libs
/// in one shape for all platforms, and started requiring `processType` on
/// threads. Sub-process profiles stay embedded as JSON strings.
pub fn upgrade_to_v4(profile: ProfileV3) -> Result<ProfileV4, MalformedError> {
    struct PartialV4 {
        meta: LegacyMeta,
        libs: Vec<Lib>,
        // `None` marks the position of an embedded sub-process profile.
        threads: Vec<Option<ThreadEntryV4>>,
        extra: serde_json::Map<String, Value>,
    }

    convert_process_tree(
        profile,
        |p: ProfileV3| -> Result<(PartialV4, Vec<ProfileV3>), MalformedError> {
            let libs = upgrade_libs_to_v4(&p.libs, p.meta.abi.as_deref())?;
            let mut threads = Vec::with_capacity(p.threads.len());
            let mut subprocesses = Vec::new();
            for entry in p.threads {
                match entry {
                    ThreadEntryV3::Subprocess(json) => {
                        log::debug!("Decoding embedded sub-process profile ({} bytes)", json.len());
                        subprocesses.push(serde_json::from_str::<ProfileV3>(&json)?);
                        threads.push(None);
                    }
                    ThreadEntryV3::Thread(thread) => {
                        threads.push(Some(ThreadEntryV4::Thread(upgrade_thread_to_v4(thread))));
                    }
                }
            }
            let partial = PartialV4 {
                meta: p.meta,
                libs,
                threads,
                extra: p.extra,
            };
            Ok((partial, subprocesses))
        },
        |partial: PartialV4, subprocesses: Vec<ProfileV4>| -> Result<ProfileV4, MalformedError> {
            let mut subprocesses = subprocesses.into_iter();
            let mut threads = Vec::with_capacity(partial.threads.len());
            for entry in partial.threads {
                match entry {
                    Some(thread) => threads.push(thread),
                    None => {
                        if let Some(subprocess) = subprocesses.next() {
                            let json = serde_json::to_string(&subprocess)?;
                            threads.push(ThreadEntryV4::Subprocess(json));
                        }
                    }
                }
            }
            Ok(ProfileV4 {
                meta: partial.meta,
                libs: partial.libs,
                threads,
                extra: partial.extra,
            })
        },
    )
}

fn arch_from_abi(abi: &str) -> &str {
    match abi {
        "x86_64-gcc3" => "x86_64",
        abi => abi,
    }
}

fn upgrade_libs_to_v4(libs_json: &str, abi: Option<&str>) -> Result<Vec<Lib>, MalformedError> {
    let legacy_libs: Vec<LegacyLib> = serde_json::from_str(libs_json)?;
    let arch = abi.map(|abi| arch_from_abi(abi).to_string());
    let mut libs = legacy_libs
        .into_iter()
        .map(|lib| upgrade_lib_to_v4(lib, arch.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    libs.sort_by_key(|lib| lib.start);
    Ok(libs)
}

fn upgrade_lib_to_v4(lib: LegacyLib, arch: Option<String>) -> Result<Lib, MalformedError> {
    let (debug_name, breakpad_id) = match (lib.breakpad_id, lib.pdb_signature) {
        (Some(breakpad_id), _) => {
            let debug_name = match lib.name.rfind('/') {
                Some(slash_pos) => lib.name[slash_pos + 1..].to_string(),
                None => lib.name.clone(),
            };
            (debug_name, breakpad_id)
        }
        (None, Some(pdb_signature)) => {
            let signature: String = pdb_signature
                .chars()
                .filter(|c| !matches!(c, '{' | '}' | '-'))
                .collect::<String>()
                .to_uppercase();
            let age = lib.pdb_age.unwrap_or(0);
            let debug_name = lib.pdb_name.unwrap_or_default();
            (debug_name, format!("{signature}{age}"))
        }
        (None, None) => return Err(MalformedError::MissingLibIdentifier(lib.name)),
    };
    let name = debug_name
        .strip_suffix(".pdb")
        .unwrap_or(debug_name.as_str())
        .to_string();
    Ok(Lib {
        name,
        path: lib.name,
        debug_name,
        debug_path: String::new(),
        breakpad_id,
        arch,
        start: lib.start,
        end: lib.end,
        extra: lib.extra,
    })
}

fn upgrade_thread_to_v4(thread: ThreadV3) -> ThreadV4 {
    // Early version 3 profiles called the main thread of content processes
    // "Content" and had no processType. The version number wasn't bumped
    // when that changed, so both layouts exist as version 3.
    let (name, process_type) = match thread.process_type {
        Some(process_type) => (thread.name, process_type),
        None => match thread.name.as_str() {
            "Content" => ("GeckoMain".to_string(), ProcessType::Tab),
            "Plugin" => (thread.name, ProcessType::Plugin),
            _ => (thread.name, ProcessType::Default),
        },
    };
    ThreadV4 {
        name,
        process_type,
        samples: thread.samples,
        markers: thread.markers,
        string_table: thread.string_table,
        extra: thread.extra,
    }
}

/// Version 5 moved the embedded sub-process profiles out of `threads` and
/// into a new `processes` array, decoded.
pub fn upgrade_to_v5(profile: ProfileV4) -> Result<ProfileV5, MalformedError> {
    type PartialV5 = (LegacyMeta, Vec<Lib>, Vec<ThreadV4>, serde_json::Map<String, Value>);

    convert_process_tree(
        profile,
        |p: ProfileV4| -> Result<(PartialV5, Vec<ProfileV4>), MalformedError> {
            let mut threads = Vec::with_capacity(p.threads.len());
            let mut subprocesses = Vec::new();
            for entry in p.threads {
                match entry {
                    ThreadEntryV4::Thread(thread) => threads.push(thread),
                    ThreadEntryV4::Subprocess(json) => {
                        subprocesses.push(serde_json::from_str::<ProfileV4>(&json)?);
                    }
                }
            }
            let mut extra = p.extra;
            // Replaced by the decoded sub-processes.
            extra.remove("processes");
            Ok(((p.meta, p.libs, threads, extra), subprocesses))
        },
        |(meta, libs, threads, extra): PartialV5, processes: Vec<ProfileV5>| {
            Ok(ProfileV5 {
                meta,
                libs,
                threads,
                processes,
                extra,
            })
        },
    )
}

/// Version 6 removed the `frameNumber` column from the samples table. It was
/// always the sixth and last column.
pub fn upgrade_to_v6(profile: &mut ProfileV5) -> Result<(), MalformedError> {
    for_each_process_mut(profile, |p: &mut ProfileV5| -> Result<(), MalformedError> {
        for thread in &mut p.threads {
            thread.samples.drop_column("frameNumber");
            thread.samples.truncate_rows(5);
        }
        Ok(())
    })
}

/// Version 7 renamed the `type` field of DOMEvent marker payloads to
/// `eventType`; `type` is now always "DOMEvent".
pub fn upgrade_to_v7(profile: &mut ProfileV5) -> Result<(), MalformedError> {
    for_each_process_mut(profile, |p: &mut ProfileV5| -> Result<(), MalformedError> {
        for thread in &mut p.threads {
            let string_table = StringTable::from_ordered_strings(&thread.string_table);
            let markers = &mut thread.markers;
            for marker_index in 0..markers.len() {
                let name_index = string_index_cell(markers, marker_index, "name")?;
                if string_table.get_string(name_index)? != "DOMEvent" {
                    continue;
                }
                let payload = markers.cell_mut(marker_index, "data")?;
                *payload = upgrade_dom_event_payload_gecko_6_to_7(payload.take())?;
            }
        }
        Ok(())
    })
}

fn string_index_cell(
    table: &ColumnarTable,
    row_index: usize,
    column: &str,
) -> Result<usize, MalformedError> {
    table
        .get_cell(row_index, column)?
        .as_u64()
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| MalformedError::UnexpectedCellType {
            column: column.to_string(),
            expected: "a string table index",
        })
}

/// Version 8 added `pausedRanges`, `meta.shutdownTime` and the per-thread
/// `registerTime` / `unregisterTime`.
///
/// Older profiles don't have this information, so the new fields get the
/// only values that don't claim anything: the profiler was never paused,
/// every process was still alive at capture time, and every thread was
/// registered at process start and never unregistered.
pub fn upgrade_to_v8(profile: ProfileV5) -> Result<Profile, MalformedError> {
    type PartialV8 = (LegacyMeta, Vec<Lib>, Vec<ThreadV4>, serde_json::Map<String, Value>);

    convert_process_tree(
        profile,
        |p: ProfileV5| -> Result<(PartialV8, Vec<ProfileV5>), MalformedError> {
            let ProfileV5 {
                meta,
                libs,
                threads,
                processes,
                extra,
            } = p;
            Ok(((meta, libs, threads, extra), processes))
        },
        |(meta, libs, threads, extra): PartialV8, processes: Vec<Profile>| {
            let mut meta_extra = meta.extra;
            meta_extra.remove("shutdownTime");
            let mut extra = extra;
            extra.remove("pausedRanges");
            Ok(Profile {
                meta: Meta {
                    version: meta.version,
                    abi: meta.abi,
                    shutdown_time: None,
                    extra: meta_extra,
                },
                libs,
                threads: threads.into_iter().map(upgrade_thread_to_v8).collect(),
                processes,
                paused_ranges: Vec::new(),
                extra,
            })
        },
    )
}

fn upgrade_thread_to_v8(thread: ThreadV4) -> Thread {
    let mut extra = thread.extra;
    extra.remove("registerTime");
    extra.remove("unregisterTime");
    Thread {
        name: thread.name,
        process_type: thread.process_type,
        register_time: Number::from(0),
        unregister_time: None,
        samples: thread.samples,
        markers: thread.markers,
        string_table: thread.string_table,
        extra,
    }
}

/// Version 9 changed the payload layouts of GCMinor and GCMajor markers.
pub fn upgrade_to_v9(profile: &mut Profile) -> Result<(), MalformedError> {
    for_each_process_mut(profile, |p: &mut Profile| -> Result<(), MalformedError> {
        for thread in &mut p.threads {
            let Some(data_column) = thread.markers.column_index("data") else {
                continue;
            };
            for row in &mut thread.markers.data {
                let Some(cell) = row.get_mut(data_column) else {
                    continue;
                };
                if cell.is_null() {
                    continue;
                }
                *cell = upgrade_marker_payload_gecko_8_to_9(cell.take())?;
            }
        }
        Ok(())
    })
}
