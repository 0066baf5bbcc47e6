use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(
        "Unable to parse a Gecko profile of version {found} - are you running an outdated version of this tool? \
         The most recent version understood by this version is version {supported}. \
         You can try updating in case a newer version has been released in the meantime."
    )]
    FutureVersion { found: u32, supported: u32 },

    #[error(
        "{} very old and no conversion code has been written for that version of the profile format.",
        describe_old_profiles(.0)
    )]
    UnsupportedVersion(u32),

    #[error("The profile's meta.version field is not a valid version number: {0}")]
    InvalidVersionTag(String),

    #[error("Couldn't parse the profile JSON: {0}")]
    ParseJson(#[source] serde_json::Error),

    #[error("Malformed profile, detected while upgrading to version {version}: {source}")]
    MalformedProfile {
        version: u32,
        #[source]
        source: MalformedError,
    },
}

impl Error {
    pub(crate) fn malformed(version: u32, source: MalformedError) -> Self {
        Error::MalformedProfile { version, source }
    }
}

fn describe_old_profiles(version: &u32) -> String {
    match *version {
        0 => "Gecko profiles without version numbers are".to_string(),
        version => format!("Gecko profile version {version} is"),
    }
}

/// A structural assumption that did not hold while a single upgrade step ran.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MalformedError {
    #[error("Index {index} is out of range for a table of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("The table schema has no {0:?} column")]
    MissingColumn(String),

    #[error("Unexpected cell contents in column {column:?}: expected {expected}")]
    UnexpectedCellType {
        column: String,
        expected: &'static str,
    },

    #[error("Library {0:?} has neither a breakpadId nor a pdbSignature")]
    MissingLibIdentifier(String),

    #[error("Could not decode profile data: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
