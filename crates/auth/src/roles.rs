use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role identifier used for access control.
///
/// The string form is the app-role value issued by the identity provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Programme administrators: full access to every area.
    Admin,
    /// Volunteer mentors: their own profile, sessions, reports and checks.
    Mentor,
    /// Attendance officers, scoped to the chapter they are assigned to.
    Attendances,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Mentor, Role::Attendances];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Mentor => "Mentor",
            Role::Attendances => "Attendances",
        }
    }

    /// Map a raw role claim to a known role. Unknown claims yield `None`.
    pub fn from_claim(claim: &str) -> Option<Role> {
        let claim = claim.trim();
        Role::ALL.into_iter().find(|role| role.as_str() == claim)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_claim(s).ok_or_else(|| UnknownRole(s.to_string()))
    }
}
