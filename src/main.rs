use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::bufread::GzDecoder;
use flate2::{Compression, GzBuilder};
use gecko_profile_versioning::{
    gecko_profile_version, upgrade_gecko_profile_to_current_version, CURRENT_VERSION,
};
use serde_json::Value;

// Level two is fast and already gets most of the size reduction.
const GZIP_COMPRESSION_LEVEL: u32 = 2;

// The oldest version that can still be converted.
const OLDEST_SUPPORTED_VERSION: u32 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "gecko-profile-upgrade",
    version,
    about = r#"
Upgrades a profile in the Gecko profile format to the current format version.

EXAMPLES:
    # Upgrade a profile and print the result:
    gecko-profile-upgrade old-profile.json

    # Write the upgraded profile to a compressed file:
    gecko-profile-upgrade old-profile.json.gz -o profile.json.gz

    # Only check which version a profile has:
    gecko-profile-upgrade --print-version old-profile.json
"#
)]
struct Opt {
    /// Path to the profile. Files ending in .gz are decompressed.
    file: PathBuf,

    /// Output filename. A .gz extension produces compressed output. Prints to
    /// stdout if not specified.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the profile's format version instead of upgrading it.
    #[arg(long)]
    print_version: bool,
}

fn main() {
    env_logger::init();
    let opt = Opt::parse();

    let mut profile = match read_profile(&opt.file) {
        Ok(profile) => profile,
        Err(err) => {
            eprintln!("Could not read the profile from {:?}: {}", opt.file, err);
            std::process::exit(1)
        }
    };

    if opt.print_version {
        match gecko_profile_version(&profile) {
            Ok(version) => println!("{}", describe_version(version)),
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1)
            }
        }
        return;
    }

    if let Err(err) = upgrade_gecko_profile_to_current_version(&mut profile) {
        eprintln!("Could not upgrade the profile in {:?}: {}", opt.file, err);
        std::process::exit(1)
    }
    log::info!("Upgraded {:?} to version {}", opt.file, CURRENT_VERSION);

    let result = match &opt.output {
        Some(output_path) => save_profile_to_file(&profile, output_path),
        None => write_profile(&profile, std::io::stdout().lock()).map(|_| ()),
    };
    if let Err(err) = result {
        eprintln!("Could not write the upgraded profile: {err}");
        std::process::exit(1)
    }
}

fn describe_version(version: u32) -> String {
    if version == CURRENT_VERSION {
        format!("version {version} (current)")
    } else if version > CURRENT_VERSION {
        format!("version {version} (newer than the supported version {CURRENT_VERSION})")
    } else if version < OLDEST_SUPPORTED_VERSION {
        format!("version {version} (too old to be upgraded)")
    } else {
        format!("version {version} (can be upgraded to version {CURRENT_VERSION})")
    }
}

fn read_profile(path: &Path) -> std::io::Result<Value> {
    let reader = BufReader::new(File::open(path)?);
    let profile = if path.extension() == Some(OsStr::new("gz")) {
        serde_json::from_reader(BufReader::new(GzDecoder::new(reader)))?
    } else {
        serde_json::from_reader(reader)?
    };
    Ok(profile)
}

fn save_profile_to_file(profile: &Value, output_path: &Path) -> std::io::Result<()> {
    let writer = BufWriter::new(File::create(output_path)?);
    if output_path.extension() == Some(OsStr::new("gz")) {
        let name_without_gz = output_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let builder = GzBuilder::new().filename(name_without_gz.as_bytes());
        let gz = builder.write(writer, Compression::new(GZIP_COMPRESSION_LEVEL));
        let mut gz = write_profile(profile, BufWriter::new(gz))?
            .into_inner()
            .map_err(|e| e.into_error())?;
        gz.try_finish()?;
        Ok(())
    } else {
        write_profile(profile, writer).map(|_| ())
    }
}

fn write_profile<W: Write>(profile: &Value, mut writer: W) -> std::io::Result<W> {
    serde_json::to_writer(&mut writer, profile)?;
    writer.flush()?;
    Ok(writer)
}
