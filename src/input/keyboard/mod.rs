//! Keyboard-related types for seats

use tracing::debug;

use crate::utils::{ClientId, SurfaceId};

use super::KeyboardFocusProvider;

/// State of the keyboard of a seat
///
/// Only the focus is tracked: the selection follows the client owning the keyboard focus.
#[derive(Debug, Default)]
pub struct KeyboardState {
    focus: Option<(SurfaceId, ClientId)>,
}

impl KeyboardState {
    /// The surface that has keyboard focus
    pub fn current_focus(&self) -> Option<SurfaceId> {
        self.focus.map(|(surface, _)| surface)
    }

    /// Set the keyboard focus
    ///
    /// Returns `true` if the focused client changed.
    pub(crate) fn set_focus(&mut self, focus: Option<(SurfaceId, ClientId)>) -> bool {
        let previous = self.focused_client();
        self.focus = focus;
        let changed = previous != self.focused_client();
        if changed {
            debug!(surface = ?self.current_focus(), "keyboard focus moved to another client");
        }
        changed
    }

    pub(crate) fn surface_destroyed(&mut self, surface: SurfaceId) -> bool {
        if self.current_focus() == Some(surface) {
            self.set_focus(None)
        } else {
            false
        }
    }

    pub(crate) fn client_disconnected(&mut self, client: ClientId) -> bool {
        if self.focused_client() == Some(client) {
            self.set_focus(None)
        } else {
            false
        }
    }
}

impl KeyboardFocusProvider for KeyboardState {
    fn focused_client(&self) -> Option<ClientId> {
        self.focus.map(|(_, client)| client)
    }
}
