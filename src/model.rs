//! Model identity: a family plus an optional pinned version.
//!
//! Identifiers ending in a four-digit date stamp (`gpt-4-0613`) carry a
//! concrete version; bare family tokens (`gpt-4`) leave the version open
//! until the service reports one. The stamp heuristic cannot tell a dated
//! version from a family whose name happens to end in `-NNNN`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::error::{ChatError, Result};

static DATE_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-[0-9]{4}$").expect("date stamp pattern is valid"));

// ---------------------------------------------------------------------------
// Families
// ---------------------------------------------------------------------------

/// Model families the session knows how to account tokens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// `gpt-3.5-turbo`
    Gpt35Turbo,
    /// `gpt-4`
    Gpt4,
}

impl ModelFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpt35Turbo => "gpt-3.5-turbo",
            Self::Gpt4 => "gpt-4",
        }
    }
}

impl FromStr for ModelFamily {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gpt-3.5-turbo" => Ok(Self::Gpt35Turbo),
            "gpt-4" => Ok(Self::Gpt4),
            other => Err(ChatError::UnknownModel {
                family: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A model family with an optional concrete version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIdentity {
    family: ModelFamily,
    version: Option<String>,
}

impl ModelIdentity {
    /// Parse an identifier such as `gpt-4` or `gpt-3.5-turbo-0613`.
    pub fn parse(identifier: &str) -> Result<Self> {
        if DATE_STAMP.is_match(identifier) {
            let family_token = &identifier[..identifier.len() - 5];
            Ok(Self {
                family: family_token.parse()?,
                version: Some(identifier.to_string()),
            })
        } else {
            Ok(Self {
                family: identifier.parse()?,
                version: None,
            })
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The identifier used to address the service and the tokenizer:
    /// the version if known, else the bare family token.
    pub fn canonical(&self) -> &str {
        self.version.as_deref().unwrap_or(self.family.as_str())
    }

    /// Reconcile against the identity a response reported.
    ///
    /// An unpinned identity adopts the observed version; a pinned one
    /// demands an exact match. Family changes are always rejected.
    pub fn reconcile(&mut self, observed: &ModelIdentity) -> Result<()> {
        if self.family != observed.family {
            return Err(ChatError::FamilyMismatch {
                expected: self.family.to_string(),
                actual: observed.canonical().to_string(),
            });
        }
        match &self.version {
            None => {
                if let Some(version) = &observed.version {
                    info!(model = %version, "pinned model version");
                }
                self.version = observed.version.clone();
                Ok(())
            }
            Some(pinned) if observed.version.as_deref() == Some(pinned.as_str()) => Ok(()),
            Some(pinned) => Err(ChatError::ModelMismatch {
                expected: pinned.clone(),
                actual: observed.canonical().to_string(),
            }),
        }
    }
}

impl FromStr for ModelIdentity {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
