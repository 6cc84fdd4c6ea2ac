//! Three-valued verdict shared by position and result checks.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Outcome of one extension validation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Proceed normally.
    Allow,
    /// Hard schema error.
    Deny,
    /// Drop the instance without reporting an error.
    SkipSilently,
}

/// Wire code for [`Verdict::Allow`].
pub const VERDICT_CODE_ALLOW: i32 = 0;
/// Wire code for [`Verdict::Deny`].
pub const VERDICT_CODE_DENY: i32 = 1;
/// Wire code for [`Verdict::SkipSilently`].
pub const VERDICT_CODE_SKIP: i32 = 2;

impl Verdict {
    /// Stable numeric code shared with other implementations.
    pub fn code(self) -> i32 {
        match self {
            Self::Allow => VERDICT_CODE_ALLOW,
            Self::Deny => VERDICT_CODE_DENY,
            Self::SkipSilently => VERDICT_CODE_SKIP,
        }
    }

    /// Decodes one numeric verdict code.
    pub fn from_code(code: i32) -> Result<Self, VerdictCodeError> {
        match code {
            VERDICT_CODE_ALLOW => Ok(Self::Allow),
            VERDICT_CODE_DENY => Ok(Self::Deny),
            VERDICT_CODE_SKIP => Ok(Self::SkipSilently),
            other => Err(VerdictCodeError::UnknownCode(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::SkipSilently => "skip",
        }
    }

    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }
}

impl From<Verdict> for i32 {
    fn from(value: Verdict) -> Self {
        value.code()
    }
}

impl TryFrom<i32> for Verdict {
    type Error = VerdictCodeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_code(value)
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict decode errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictCodeError {
    UnknownCode(i32),
}

impl Display for VerdictCodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCode(value) => {
                write!(f, "verdict code is unknown: {value}; expected 0|1|2")
            }
        }
    }
}

impl Error for VerdictCodeError {}
