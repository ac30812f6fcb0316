use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Privilege levels, ordered: an administrator token also grants access to
/// voter-level routes, mirroring the fact that administrators may vote.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A route's required privilege, lifted to the type level so request guards
/// can demand it: `AuthToken<Voter>` admits any signed-in user,
/// `AuthToken<Admin>` only administrators.
pub trait Privilege {
    const RIGHTS: Rights;
}

/// Marker: any signed-in user.
pub struct Voter;

/// Marker: administrators only.
pub struct Admin;

impl Privilege for Voter {
    const RIGHTS: Rights = Rights::Voter;
}

impl Privilege for Admin {
    const RIGHTS: Rights = Rights::Admin;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_outranks_voter() {
        assert!(Rights::Admin >= Rights::Voter);
        assert!(Rights::Voter >= Rights::Voter);
        assert!(!(Rights::Voter >= Rights::Admin));
    }
}
