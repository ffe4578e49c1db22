//! Matching the invoking user against an ACL.

use log::info;

use crate::acl::{Acl, Permission};
use crate::error::{Result, ScopyError};

/// Outcome of looking a user up in an ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    pub granted: bool,
    pub permission: Option<Permission>,
}

impl Authorization {
    pub fn denied() -> Self {
        Self {
            granted: false,
            permission: None,
        }
    }

    pub fn granted(permission: Permission) -> Self {
        Self {
            granted: true,
            permission: Some(permission),
        }
    }

    /// The granted permission, provided it includes reading.
    pub fn require_read(&self, user: &str) -> Result<Permission> {
        match self.permission {
            Some(p) if self.granted && p.allows_read() => Ok(p),
            Some(_) if self.granted => Err(ScopyError::NotAuthorized {
                user: user.to_string(),
                action: "read this file",
            }),
            _ => Err(ScopyError::NotAuthorized {
                user: user.to_string(),
                action: "access this file",
            }),
        }
    }
}

/// Look `user` up in `acl`. The first entry with exactly that name decides;
/// comparison is byte-for-byte and case-sensitive.
pub fn authorize(user: &str, acl: &Acl) -> Authorization {
    match acl.entries().iter().find(|entry| entry.name == user) {
        Some(entry) => {
            info!("{} granted {}", user, entry.permission);
            Authorization::granted(entry.permission)
        }
        None => {
            info!("{} has no entry", user);
            Authorization::denied()
        }
    }
}
