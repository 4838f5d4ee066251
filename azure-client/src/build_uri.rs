//! Build references embedded in release artifacts.
//!
//! Azure DevOps links a release artifact to the build that produced it with a
//! `vstfs:///Build/Build/<id>` URI rather than a structured reference. The URI
//! is parsed once into a `BuildId` so the rest of the code never touches the
//! string convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BUILD_URI_PREFIX: &str = "vstfs:///Build/Build/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub u64);

impl BuildId {
    /// Extract the build id from a `vstfs:///Build/Build/<id>` URI.
    ///
    /// Returns `None` for anything that does not follow the convention.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let id = uri.trim().strip_prefix(BUILD_URI_PREFIX)?;
        if id.contains('/') {
            return None;
        }
        id.parse().ok().map(BuildId)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BuildId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BuildId)
    }
}
