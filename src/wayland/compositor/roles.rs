//! Surface roles
//!
//! A surface without a role is not displayed at all. Assigning a role is a one-way
//! transition: once a surface was promoted to a toplevel or a popup, it keeps that
//! role for the rest of its life, and any attempt to give it a different one is a
//! protocol error.

use std::fmt;

use thiserror::Error;

use crate::utils::{Logical, Rectangle, SurfaceId};

/// The roles a surface can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A top-level window
    Toplevel,
    /// A popup, attached to a parent shell surface
    Popup,
}

impl Role {
    /// Whether surfaces with this role must wait for a configure to be acked
    /// before their content may be presented
    pub fn requires_configure(&self) -> bool {
        matches!(self, Role::Toplevel | Role::Popup)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Toplevel => f.write_str("xdg_toplevel"),
            Role::Popup => f.write_str("xdg_popup"),
        }
    }
}

/// A role assignment, as requested by a client
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoleParams {
    /// Make the surface a toplevel
    Toplevel,
    /// Make the surface a popup
    Popup {
        /// the parent shell surface
        parent: SurfaceId,
        /// geometry of the popup relative to its parent, as computed from its positioner
        geometry: Rectangle<i32, Logical>,
    },
}

impl RoleParams {
    /// The role this assignment gives
    pub fn role(&self) -> Role {
        match self {
            RoleParams::Toplevel => Role::Toplevel,
            RoleParams::Popup { .. } => Role::Popup,
        }
    }
}

/// An error type signifying that the surface already has a role and
/// cannot be assigned an other
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("surface already has the {existing} role")]
pub struct AlreadyHasRole {
    /// the role of the surface
    pub existing: Role,
}

/// Give a role to a surface
///
/// Returns `Ok(true)` if the role was newly assigned, `Ok(false)` if the surface already
/// had this very role.
pub(crate) fn give_role(current: &mut Option<Role>, role: Role) -> Result<bool, AlreadyHasRole> {
    match *current {
        None => {
            *current = Some(role);
            Ok(true)
        }
        Some(existing) if existing == role => Ok(false),
        Some(existing) => Err(AlreadyHasRole { existing }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_assigned_once() {
        let mut role = None;
        assert_eq!(give_role(&mut role, Role::Toplevel), Ok(true));
        assert_eq!(give_role(&mut role, Role::Toplevel), Ok(false));
        assert_eq!(
            give_role(&mut role, Role::Popup),
            Err(AlreadyHasRole {
                existing: Role::Toplevel
            })
        );
        assert_eq!(role, Some(Role::Toplevel));
    }
}
