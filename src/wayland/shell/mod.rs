//! Handler utilities for the shell protocols
//!
//! A shell represents the logic associated to displaying windows and arranging them on
//! the screen. The [`xdg`] module provides the state machine of the `xdg_shell` protocol,
//! the current standard for desktop apps.

use thiserror::Error;

use crate::utils::Serial;

pub mod xdg;

/// Represents the possible errors returned from
/// a client ping
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PingError {
    /// The operation failed because the client is no longer connected
    #[error("the ping failed cause the client is no longer connected")]
    DeadClient,
    /// There is already a pending ping
    #[error("there is already a ping pending `{0:?}`")]
    PingAlreadyPending(Serial),
}
