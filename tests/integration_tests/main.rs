use assert_json_diff::assert_json_eq;
use gecko_profile_versioning::{
    upgrade_gecko_profile_json, upgrade_gecko_profile_to_current_version, Error, MalformedError,
    Profile, CURRENT_VERSION,
};
use serde_json::{json, Value};

fn marker_schema() -> Value {
    json!({ "name": 0, "time": 1, "data": 2 })
}

/// A thread as it looked in version 3: no processType, a frameNumber column
/// in the samples table and old-style marker payloads.
fn v3_thread(name: &str) -> Value {
    json!({
        "name": name,
        "tid": 7,
        "samples": {
            "schema": { "stack": 0, "time": 1, "responsiveness": 2, "rss": 3, "uss": 4, "frameNumber": 5 },
            "data": [
                [0, 1.0, 0.0, null, null, 42],
                [1, 2.0, 0.5, null, null, 43]
            ]
        },
        "markers": {
            "schema": marker_schema(),
            "data": [
                [0, 1.5, { "type": "click", "startTime": 1.0, "endTime": 1.5 }],
                [1, 2.0, { "type": "GCMinor", "nursery": { "nursery_bytes": 10, "new_nursery_bytes": 20, "timings": {} } }],
                [2, 3.0, null]
            ]
        },
        "stringTable": ["DOMEvent", "GCMinor", "Paint"]
    })
}

/// The same thread after being upgraded to the current version.
fn current_thread(name: &str, process_type: &str) -> Value {
    json!({
        "name": name,
        "processType": process_type,
        "registerTime": 0,
        "unregisterTime": null,
        "tid": 7,
        "samples": {
            "schema": { "stack": 0, "time": 1, "responsiveness": 2, "rss": 3, "uss": 4 },
            "data": [
                [0, 1.0, 0.0, null, null],
                [1, 2.0, 0.5, null, null]
            ]
        },
        "markers": {
            "schema": marker_schema(),
            "data": [
                [0, 1.5, { "type": "DOMEvent", "eventType": "click", "startTime": 1.0, "endTime": 1.5 }],
                [1, 2.0, { "type": "GCMinor", "nursery": { "status": "complete", "bytes_used": 10, "new_capacity": 20, "phase_times": {} } }],
                [2, 3.0, null]
            ]
        },
        "stringTable": ["DOMEvent", "GCMinor", "Paint"]
    })
}

fn v3_profile(threads: Vec<Value>, libs: Value) -> Value {
    json!({
        "meta": { "version": 3, "abi": "x86_64-gcc3", "startTime": 1000.0, "interval": 1 },
        "libs": libs.to_string(),
        "threads": threads
    })
}

fn embedded(profile: &Value) -> Value {
    Value::String(profile.to_string())
}

fn upgraded(mut profile: Value) -> Value {
    upgrade_gecko_profile_to_current_version(&mut profile).unwrap();
    profile
}

#[test]
fn version_3_profile_with_nested_subprocesses() {
    let grandchild = v3_profile(vec![v3_thread("GeckoMain")], json!([]));
    let child = v3_profile(
        vec![v3_thread("Plugin"), embedded(&grandchild)],
        json!([{ "name": "/usr/lib/libplugin.so", "breakpadId": "CCC0", "start": 5000, "end": 6000, "offset": 0 }]),
    );
    let parent = v3_profile(
        vec![embedded(&child), v3_thread("Content")],
        json!([
            { "name": "/usr/lib/libxul.so", "breakpadId": "AAA0", "start": 2000, "end": 3000, "offset": 0 },
            { "name": "/lib/libc.so.6", "breakpadId": "BBB0", "start": 1000, "end": 1500, "offset": 0 }
        ]),
    );

    let meta = json!({
        "version": 9,
        "abi": "x86_64-gcc3",
        "startTime": 1000.0,
        "interval": 1,
        "shutdownTime": null
    });
    let expected_grandchild = json!({
        "meta": meta,
        "libs": [],
        "threads": [current_thread("GeckoMain", "default")],
        "processes": [],
        "pausedRanges": []
    });
    let expected_child = json!({
        "meta": meta,
        "libs": [{
            "name": "libplugin.so",
            "path": "/usr/lib/libplugin.so",
            "debugName": "libplugin.so",
            "debugPath": "",
            "breakpadId": "CCC0",
            "arch": "x86_64",
            "start": 5000,
            "end": 6000,
            "offset": 0
        }],
        "threads": [current_thread("Plugin", "plugin")],
        "processes": [expected_grandchild],
        "pausedRanges": []
    });
    let expected = json!({
        "meta": meta,
        "libs": [
            {
                "name": "libc.so.6",
                "path": "/lib/libc.so.6",
                "debugName": "libc.so.6",
                "debugPath": "",
                "breakpadId": "BBB0",
                "arch": "x86_64",
                "start": 1000,
                "end": 1500,
                "offset": 0
            },
            {
                "name": "libxul.so",
                "path": "/usr/lib/libxul.so",
                "debugName": "libxul.so",
                "debugPath": "",
                "breakpadId": "AAA0",
                "arch": "x86_64",
                "start": 2000,
                "end": 3000,
                "offset": 0
            }
        ],
        "threads": [current_thread("GeckoMain", "tab")],
        "processes": [expected_child],
        "pausedRanges": []
    });

    assert_json_eq!(upgraded(parent), expected);
}

#[test]
fn windows_libs_are_normalized() {
    let mut profile = v3_profile(
        vec![],
        json!([{
            "name": "C:\\Windows\\System32\\ntdll.dll",
            "pdbName": "ntdll.pdb",
            "pdbSignature": "{9d4a5d2b-e6f7-4c0b-8a5e-1f2e3d4c5b6a}",
            "pdbAge": 1,
            "start": 140000,
            "end": 150000
        }]),
    );
    profile["meta"]["abi"] = json!("x86-msvc");

    let profile = upgraded(profile);
    assert_json_eq!(
        profile["libs"],
        json!([{
            "name": "ntdll",
            "path": "C:\\Windows\\System32\\ntdll.dll",
            "debugName": "ntdll.pdb",
            "debugPath": "",
            "breakpadId": "9D4A5D2BE6F74C0B8A5E1F2E3D4C5B6A1",
            "arch": "x86-msvc",
            "start": 140000,
            "end": 150000
        }])
    );
}

#[test]
fn embedded_subprocess_moves_to_processes() {
    let v4_thread = |name: &str| {
        let mut thread = v3_thread(name);
        thread["processType"] = json!("default");
        thread
    };
    let child = json!({
        "meta": { "version": 4 },
        "libs": [],
        "threads": [v4_thread("ChildMain")]
    });
    let profile = json!({
        "meta": { "version": 4 },
        "libs": [],
        "threads": [v4_thread("First"), embedded(&child), v4_thread("Second")]
    });

    let profile = upgraded(profile);
    let names: Vec<&str> = profile["threads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|thread| thread["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["First", "Second"]);
    assert_eq!(profile["processes"].as_array().unwrap().len(), 1);
    assert_eq!(profile["processes"][0]["threads"][0]["name"], "ChildMain");
    assert_eq!(profile["processes"][0]["meta"]["version"], CURRENT_VERSION);
}

fn v5_thread() -> Value {
    json!({
        "name": "GeckoMain",
        "processType": "default",
        "samples": {
            "schema": { "stack": 0, "time": 1, "responsiveness": 2, "rss": 3, "uss": 4, "frameNumber": 5 },
            "data": [[0, 1.0, 0.0, null, null, 1], [0, 2.0, 0.0, null, null, 2, "trailing"]]
        },
        "markers": { "schema": marker_schema(), "data": [] },
        "stringTable": []
    })
}

#[test]
fn frame_number_column_is_removed() {
    let child = json!({ "meta": { "version": 5 }, "libs": [], "threads": [v5_thread()], "processes": [] });
    let profile = json!({
        "meta": { "version": 5 },
        "libs": [],
        "threads": [v5_thread()],
        "processes": [child]
    });

    let profile = upgraded(profile);
    for samples in [
        &profile["threads"][0]["samples"],
        &profile["processes"][0]["threads"][0]["samples"],
    ] {
        assert!(samples["schema"].get("frameNumber").is_none());
        for row in samples["data"].as_array().unwrap() {
            assert_eq!(row.as_array().unwrap().len(), 5);
        }
    }
}

#[test]
fn dom_event_payloads_are_renamed() {
    let profile = json!({
        "meta": { "version": 6 },
        "libs": [],
        "threads": [{
            "name": "GeckoMain",
            "processType": "tab",
            "samples": { "schema": { "stack": 0, "time": 1 }, "data": [] },
            "markers": {
                "schema": marker_schema(),
                "data": [
                    [1, 5.0, { "type": "click" }],
                    [0, 6.0, { "type": "tracing", "category": "Paint" }]
                ]
            },
            "stringTable": ["RefreshDriverTick", "DOMEvent"]
        }],
        "processes": []
    });

    let profile = upgraded(profile);
    assert_json_eq!(
        profile["threads"][0]["markers"]["data"],
        json!([
            [1, 5.0, { "type": "DOMEvent", "eventType": "click" }],
            [0, 6.0, { "type": "tracing", "category": "Paint" }]
        ])
    );
}

#[test]
fn version_8_fields_get_empty_defaults() {
    let thread = json!({
        "name": "GeckoMain",
        "processType": "default",
        "samples": { "schema": { "stack": 0, "time": 1 }, "data": [] },
        "markers": { "schema": marker_schema(), "data": [] },
        "stringTable": []
    });
    let profile = json!({
        "meta": { "version": 7, "startTime": 5.0 },
        "libs": [],
        "threads": [thread],
        "processes": [{ "meta": { "version": 7 }, "libs": [], "threads": [thread], "processes": [] }]
    });

    let profile = upgraded(profile);
    for p in [&profile, &profile["processes"][0]] {
        assert_eq!(p["pausedRanges"], json!([]));
        assert_eq!(p["meta"]["shutdownTime"], Value::Null);
        assert_eq!(p["threads"][0]["registerTime"], json!(0));
        assert_eq!(p["threads"][0]["unregisterTime"], Value::Null);
    }
    assert_eq!(profile["meta"]["startTime"], json!(5.0));
}

#[test]
fn gc_major_markers_are_upgraded_in_version_8_profiles() {
    let profile = json!({
        "meta": { "version": 8, "shutdownTime": 100.0 },
        "libs": [],
        "threads": [{
            "name": "GeckoMain",
            "processType": "default",
            "registerTime": 3.0,
            "unregisterTime": 90.0,
            "samples": { "schema": { "stack": 0, "time": 1 }, "data": [] },
            "markers": {
                "schema": marker_schema(),
                "data": [[0, 1.0, { "type": "GCMajor", "timings": { "allocated": 1.0, "totals": { "Mark": 2000.0 } } }]]
            },
            "stringTable": ["GCMajor"]
        }],
        "processes": [],
        "pausedRanges": [{ "startTime": 10.0, "endTime": 20.0, "reason": "profiler-paused" }]
    });

    let profile = upgraded(profile);
    assert_json_eq!(
        profile["threads"][0]["markers"]["data"][0][2],
        json!({
            "type": "GCMajor",
            "timings": { "status": "completed", "allocated_bytes": 1048576, "phase_times": { "Mark": 2.0 } }
        })
    );
    assert_eq!(profile["meta"]["shutdownTime"], json!(100.0));
    assert_eq!(profile["threads"][0]["registerTime"], json!(3.0));
    assert_eq!(profile["threads"][0]["unregisterTime"], json!(90.0));
    assert_eq!(profile["pausedRanges"][0]["reason"], "profiler-paused");
}

#[test]
fn stale_paused_ranges_are_reset_in_version_8() {
    let profile = json!({
        "meta": { "version": 7 },
        "libs": [],
        "threads": [],
        "processes": [],
        "pausedRanges": [{ "startTime": 1.0, "endTime": 2.0, "reason": "bogus" }]
    });
    let profile = upgraded(profile);
    assert_eq!(profile["pausedRanges"], json!([]));
}

#[test]
fn stale_processes_are_replaced_by_embedded_subprocesses() {
    let child = v3_profile(vec![v3_thread("GeckoMain")], json!([]));
    let mut parent = v3_profile(vec![embedded(&child)], json!([]));
    parent["processes"] = json!([{ "bogus": true }]);

    let profile = upgraded(parent);
    let processes = profile["processes"].as_array().unwrap();
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0]["meta"]["version"], CURRENT_VERSION);
    assert_eq!(processes[0]["threads"][0]["name"], "GeckoMain");
}

#[test]
fn integer_times_survive_the_version_9_upgrade() {
    let profile = json!({
        "meta": { "version": 8, "shutdownTime": 250 },
        "libs": [],
        "threads": [{
            "name": "GeckoMain",
            "processType": "default",
            "registerTime": 5,
            "unregisterTime": 200,
            "samples": { "schema": { "stack": 0, "time": 1 }, "data": [] },
            "markers": { "schema": marker_schema(), "data": [] },
            "stringTable": []
        }],
        "processes": [],
        "pausedRanges": [{ "startTime": 10, "endTime": null, "reason": "profiler-paused" }]
    });
    let profile = upgraded(profile);
    assert_eq!(profile["meta"]["shutdownTime"].to_string(), "250");
    assert_eq!(profile["threads"][0]["registerTime"].to_string(), "5");
    assert_eq!(profile["threads"][0]["unregisterTime"].to_string(), "200");
    assert_eq!(profile["pausedRanges"][0]["startTime"].to_string(), "10");
}

#[test]
fn every_supported_version_ends_current() {
    let thread_v4 = {
        let mut thread = v3_thread("GeckoMain");
        thread["processType"] = json!("default");
        thread
    };
    let mut thread_v8 = thread_v4.clone();
    thread_v8["registerTime"] = json!(0);
    thread_v8["unregisterTime"] = Value::Null;

    for version in 3..=CURRENT_VERSION {
        let profile = match version {
            3 => v3_profile(vec![v3_thread("Content")], json!([])),
            4 => json!({ "meta": { "version": 4 }, "libs": [], "threads": [thread_v4] }),
            5..=7 => json!({
                "meta": { "version": version },
                "libs": [],
                "threads": [thread_v4],
                "processes": []
            }),
            _ => json!({
                "meta": { "version": version, "shutdownTime": null },
                "libs": [],
                "threads": [thread_v8],
                "processes": [],
                "pausedRanges": []
            }),
        };
        let profile = upgraded(profile);
        assert_eq!(profile["meta"]["version"], CURRENT_VERSION, "starting at {version}");
        let typed: Profile = serde_json::from_value(profile).unwrap();
        assert_eq!(typed.threads.len(), 1, "starting at {version}");
    }
}

#[test]
fn upgrading_twice_changes_nothing() {
    let profile = v3_profile(vec![v3_thread("Content")], json!([]));
    let once = upgraded(profile);
    let twice = upgraded(once.clone());
    assert_json_eq!(once, twice);
}

#[test]
fn unreconstructible_versions() {
    for version in 0..3 {
        let mut profile = v3_profile(vec![v3_thread("Content")], json!([]));
        profile["meta"]["version"] = json!(version);
        let original = profile.clone();
        let err = upgrade_gecko_profile_to_current_version(&mut profile).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(v) if v == version));
        assert!(err.to_string().contains("no conversion code"));
        if version == 0 {
            assert!(err.to_string().contains("without version numbers"));
        }
        assert_eq!(profile, original);
    }
}

#[test]
fn future_version() {
    let mut profile = json!({ "meta": { "version": 10 } });
    let err = upgrade_gecko_profile_to_current_version(&mut profile).unwrap_err();
    assert!(matches!(
        err,
        Error::FutureVersion { found: 10, supported: 9 }
    ));
    assert!(err.to_string().contains("version 9"));
}

#[test]
fn failure_leaves_the_input_untouched() {
    let profile = json!({
        "meta": { "version": 6 },
        "libs": [],
        "threads": [{
            "name": "GeckoMain",
            "processType": "default",
            "samples": { "schema": { "stack": 0, "time": 1 }, "data": [] },
            "markers": { "schema": marker_schema(), "data": [[0, 1.0, null]] },
            "stringTable": ["DOMEvent"]
        }],
        "processes": []
    });
    let mut attempted = profile.clone();
    match upgrade_gecko_profile_to_current_version(&mut attempted) {
        Err(Error::MalformedProfile { version, source }) => {
            assert_eq!(version, 7);
            assert!(matches!(source, MalformedError::UnexpectedCellType { .. }));
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(attempted, profile);
}

#[test]
fn broken_embedded_subprocess() {
    let mut profile = v3_profile(vec![json!("{ not json")], json!([]));
    match upgrade_gecko_profile_to_current_version(&mut profile) {
        Err(Error::MalformedProfile { version, source }) => {
            assert_eq!(version, 4);
            assert!(matches!(source, MalformedError::InvalidJson(_)));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn json_strings() {
    let input = json!({
        "meta": { "version": 7 },
        "libs": [],
        "threads": [],
        "processes": []
    })
    .to_string();
    let output: Value = serde_json::from_str(&upgrade_gecko_profile_json(&input).unwrap()).unwrap();
    assert_eq!(output["meta"]["version"], CURRENT_VERSION);
    assert_eq!(output["pausedRanges"], json!([]));

    assert!(matches!(
        upgrade_gecko_profile_json("{"),
        Err(Error::ParseJson(_))
    ));
}
