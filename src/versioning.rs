use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, MalformedError, Result};
use crate::legacy::{ProfileV3, ProfileV4, ProfileV5};
use crate::process_tree::for_each_process_mut;
use crate::profile::Profile;
use crate::upgraders;

/// The current version of the Gecko profile format.
pub const CURRENT_VERSION: u32 = 9;

// Gecko profiles before version 1 did not have a meta.version field.
const UNANNOTATED_VERSION: u32 = 0;

/// Returns the format version declared in `profile.meta.version`. A missing
/// version means the profile predates versioning, and is reported as 0.
pub fn gecko_profile_version(profile: &Value) -> Result<u32> {
    let version = profile.get("meta").and_then(|meta| meta.get("version"));
    match version {
        None | Some(Value::Null) => Ok(UNANNOTATED_VERSION),
        Some(version) => version
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| Error::InvalidVersionTag(version.to_string())),
    }
}

/// Upgrades `profile`, a decoded profile in the Gecko profile format, to
/// [`CURRENT_VERSION`].
///
/// Every conversion step between the profile's version and the current
/// version is applied in order, to the profile itself and to all of its
/// nested sub-process profiles. Profiles that are already current are not
/// touched.
///
/// `profile` is only replaced once all steps have succeeded; if an error is
/// returned, it still holds the original input.
pub fn upgrade_gecko_profile_to_current_version(profile: &mut Value) -> Result<()> {
    let profile_version = gecko_profile_version(profile)?;
    if profile_version == CURRENT_VERSION {
        return Ok(());
    }
    if profile_version > CURRENT_VERSION {
        return Err(Error::FutureVersion {
            found: profile_version,
            supported: CURRENT_VERSION,
        });
    }

    log::debug!(
        "Upgrading Gecko profile from version {} to version {}",
        profile_version,
        CURRENT_VERSION
    );

    let mut staged = StagedProfile::decode(profile_version, profile)?;
    for dest_version in profile_version + 1..=CURRENT_VERSION {
        staged = staged.upgrade_to(dest_version)?;
    }

    let mut upgraded = staged.into_current(profile_version)?;
    let stamped: std::result::Result<(), MalformedError> =
        for_each_process_mut(&mut upgraded, |p: &mut Profile| {
            p.meta.version = CURRENT_VERSION;
            Ok(())
        });
    stamped.map_err(|e| Error::malformed(CURRENT_VERSION, e))?;

    *profile = serde_json::to_value(&upgraded)
        .map_err(|e| Error::malformed(CURRENT_VERSION, e.into()))?;
    Ok(())
}

/// Parses `json`, upgrades it with [`upgrade_gecko_profile_to_current_version`]
/// and serializes the result.
pub fn upgrade_gecko_profile_json(json: &str) -> Result<String> {
    let mut profile: Value = serde_json::from_str(json).map_err(Error::ParseJson)?;
    upgrade_gecko_profile_to_current_version(&mut profile)?;
    serde_json::to_string(&profile).map_err(Error::ParseJson)
}

/// A profile in the typed layout of its current version.
enum StagedProfile {
    /// Versions 0 to 2, which can't be converted.
    Unreconstructible,
    V3(ProfileV3),
    V4(ProfileV4),
    /// Versions 5 to 7.
    V5(ProfileV5),
    /// Versions 8 and 9.
    Current(Profile),
}

impl StagedProfile {
    fn decode(version: u32, profile: &Value) -> Result<Self> {
        let malformed = |e: serde_json::Error| Error::malformed(version + 1, e.into());
        Ok(match version {
            0..=2 => StagedProfile::Unreconstructible,
            3 => StagedProfile::V3(ProfileV3::deserialize(profile).map_err(malformed)?),
            4 => StagedProfile::V4(ProfileV4::deserialize(profile).map_err(malformed)?),
            5..=7 => StagedProfile::V5(ProfileV5::deserialize(profile).map_err(malformed)?),
            _ => StagedProfile::Current(Profile::deserialize(profile).map_err(malformed)?),
        })
    }

    fn into_current(self, from_version: u32) -> Result<Profile> {
        match self {
            StagedProfile::Current(profile) => Ok(profile),
            _ => Err(Error::UnsupportedVersion(from_version)),
        }
    }

    /// Runs the upgrader that converts version `dest_version - 1` into
    /// `dest_version`.
    fn upgrade_to(self, dest_version: u32) -> Result<Self> {
        log::debug!("Applying Gecko profile upgrader for version {dest_version}");
        let malformed = |e: MalformedError| Error::malformed(dest_version, e);
        Ok(match (dest_version, self) {
            (1..=3, _) => return Err(Error::UnsupportedVersion(dest_version - 1)),
            (4, StagedProfile::V3(p)) => {
                StagedProfile::V4(upgraders::upgrade_to_v4(p).map_err(malformed)?)
            }
            (5, StagedProfile::V4(p)) => {
                StagedProfile::V5(upgraders::upgrade_to_v5(p).map_err(malformed)?)
            }
            (6, StagedProfile::V5(mut p)) => {
                upgraders::upgrade_to_v6(&mut p).map_err(malformed)?;
                StagedProfile::V5(p)
            }
            (7, StagedProfile::V5(mut p)) => {
                upgraders::upgrade_to_v7(&mut p).map_err(malformed)?;
                StagedProfile::V5(p)
            }
            (8, StagedProfile::V5(p)) => {
                StagedProfile::Current(upgraders::upgrade_to_v8(p).map_err(malformed)?)
            }
            (9, StagedProfile::Current(mut p)) => {
                upgraders::upgrade_to_v9(&mut p).map_err(malformed)?;
                StagedProfile::Current(p)
            }
            // Versions whose change didn't need any data conversion.
            (_, unchanged) => unchanged,
        })
    }
}
