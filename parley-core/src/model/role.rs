use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Side of the negotiation a client owns.
///
/// The first client to join a room becomes the offerer, the second the
/// answerer. `offer` and `answer` are accepted as legacy spellings on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "offer")]
    Offerer,
    #[serde(alias = "answer")]
    Answerer,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("role must be offerer|answerer, got {0:?}")]
pub struct ParseRoleError(pub String);

impl Role {
    pub const fn opposite(self) -> Self {
        match self {
            Role::Offerer => Role::Answerer,
            Role::Answerer => Role::Offerer,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Offerer => "offerer",
            Role::Answerer => "answerer",
        }
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offerer" | "offer" => Ok(Role::Offerer),
            "answerer" | "answer" => Ok(Role::Answerer),
            other => Err(ParseRoleError(other.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
