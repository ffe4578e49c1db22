//! Effective-uid switching between the invoking user and the installed owner.
//!
//! A setuid binary starts with the caller as its real uid and the file owner
//! as its effective (and saved) uid. [`IdentitySwitcher::lower`] acts as the
//! caller; [`IdentitySwitcher::raise`] acts as the owner and hands back an
//! [`ElevatedGuard`]. The owner identity exists only while a guard is alive,
//! and the guard lowers again on every exit path, including `?` returns and
//! panics.
//!
//! The OS calls sit behind the [`Credentials`] trait so the ordering can be
//! observed in tests without a setuid binary.

use std::io;

use log::{debug, error};
use nix::unistd::{Uid, User};

use crate::error::{Result, ScopyError};

/// The two identities available to the process, captured once at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub real: Uid,
    pub elevated: Uid,
}

impl Identity {
    /// Capture the real and effective uids of the current process.
    pub fn capture() -> Self {
        Self {
            real: Uid::current(),
            elevated: Uid::effective(),
        }
    }
}

/// Access to the process credentials.
pub trait Credentials {
    fn identity(&self) -> Identity;

    /// Set the effective uid of the process.
    fn set_effective(&self, uid: Uid) -> io::Result<()>;

    /// Account name for `uid`.
    fn user_name(&self, uid: Uid) -> io::Result<String>;
}

/// [`Credentials`] backed by the real process state.
#[derive(Debug, Clone, Copy)]
pub struct OsCredentials {
    identity: Identity,
}

impl OsCredentials {
    pub fn new() -> Self {
        Self {
            identity: Identity::capture(),
        }
    }
}

impl Default for OsCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl Credentials for OsCredentials {
    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_effective(&self, uid: Uid) -> io::Result<()> {
        nix::unistd::seteuid(uid).map_err(io::Error::from)
    }

    fn user_name(&self, uid: Uid) -> io::Result<String> {
        match User::from_uid(uid).map_err(io::Error::from)? {
            Some(user) => Ok(user.name),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no account for uid {}", uid),
            )),
        }
    }
}

/// Switches the effective identity of the process.
pub struct IdentitySwitcher<'c, C: Credentials + ?Sized> {
    creds: &'c C,
    identity: Identity,
}

impl<'c, C: Credentials + ?Sized> IdentitySwitcher<'c, C> {
    pub fn new(creds: &'c C) -> Self {
        Self {
            creds,
            identity: creds.identity(),
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Act as the invoking user.
    pub fn lower(&self) -> Result<()> {
        debug!("lowering effective uid to {}", self.identity.real);
        self.creds
            .set_effective(self.identity.real)
            .map_err(|source| ScopyError::Identity {
                action: "lowering privileges",
                source,
            })
    }

    /// Act as the installed owner until the returned guard is released.
    pub fn raise(&self) -> Result<ElevatedGuard<'_, 'c, C>> {
        debug!("raising effective uid to {}", self.identity.elevated);
        self.creds
            .set_effective(self.identity.elevated)
            .map_err(|source| ScopyError::Identity {
                action: "raising privileges",
                source,
            })?;
        Ok(ElevatedGuard {
            switcher: self,
            released: false,
        })
    }

    /// Account name of the invoking user.
    pub fn invoking_user(&self) -> Result<String> {
        self.creds
            .user_name(self.identity.real)
            .map_err(|source| ScopyError::Identity {
                action: "resolving the invoking user",
                source,
            })
    }
}

/// Proof that the process is currently acting as the installed owner.
///
/// Call [`ElevatedGuard::release`] to lower and observe failures. Dropping the
/// guard without releasing lowers too; if that fails the process aborts,
/// since there is no caller left to report to and staying elevated is not an
/// option.
#[must_use = "privileges are lowered as soon as the guard is dropped"]
pub struct ElevatedGuard<'s, 'c, C: Credentials + ?Sized> {
    switcher: &'s IdentitySwitcher<'c, C>,
    released: bool,
}

impl<C: Credentials + ?Sized> ElevatedGuard<'_, '_, C> {
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.switcher.lower()
    }
}

impl<C: Credentials + ?Sized> Drop for ElevatedGuard<'_, '_, C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.switcher.lower() {
            error!("{}; aborting", e);
            std::process::abort();
        }
    }
}
