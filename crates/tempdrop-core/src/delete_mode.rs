use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// How remote objects are deleted.
///
/// `LocalOnly` is the credential-less deployment: deletes never reach the provider.
/// `Trusted` signs destroy requests with the API secret and really removes the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteMode {
    LocalOnly,
    Trusted,
}

impl FromStr for DeleteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "local-only" | "local" => Ok(DeleteMode::LocalOnly),
            "trusted" => Ok(DeleteMode::Trusted),
            _ => Err(anyhow::anyhow!("Invalid delete mode: {}", s)),
        }
    }
}

impl Display for DeleteMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DeleteMode::LocalOnly => write!(f, "local-only"),
            DeleteMode::Trusted => write!(f, "trusted"),
        }
    }
}

/// When a deleted record leaves the local index.
///
/// `Unconditional` removes it immediately whatever the remote outcome.
/// `AfterRemote` keeps the record until the remote delete succeeds (or the
/// provider reports the object is already gone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalPolicy {
    #[default]
    Unconditional,
    AfterRemote,
}

impl FromStr for RemovalPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "unconditional" => Ok(RemovalPolicy::Unconditional),
            "after-remote" => Ok(RemovalPolicy::AfterRemote),
            _ => Err(anyhow::anyhow!("Invalid removal policy: {}", s)),
        }
    }
}

impl Display for RemovalPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RemovalPolicy::Unconditional => write!(f, "unconditional"),
            RemovalPolicy::AfterRemote => write!(f, "after-remote"),
        }
    }
}
