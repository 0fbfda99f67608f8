//! Utilities for handling shell surfaces with the `xdg_shell` protocol
//!
//! This module tracks the configure handshake of every toplevel and popup surface.
//!
//! The compositor describes the state it wants a shell surface to have (its size, whether
//! it is maximized, ...) by sending it a *configure*, identified by a [`Serial`]. The client
//! acknowledges configures once it has prepared content matching them, and only then may its
//! commits present anything. The compositor is free to send several configures before the
//! client catches up: acknowledging a configure implicitly supersedes every configure sent
//! before it.
//!
//! ### Pending and current state
//!
//! Each role keeps several copies of its state in an [`XdgRoleAttributes`]:
//!
//! - `server_pending`: changes the compositor made but did not send yet
//! - the pending configures: sent, not yet acknowledged
//! - `last_acked`: acknowledged, waiting for the next commit of the surface
//! - `current`: acknowledged and committed, this is what is on screen
//!
//! Use [`XdgShellState::with_pending_state`] to change the state of a toplevel, then
//! [`XdgShellState::send_configure`] to send it.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::utils::{ClientId, DeadResource, Logical, Rectangle, Serial, SerialCounter, Size, SurfaceId};
use crate::wayland::compositor::Cacheable;
use crate::wayland::protocol::{Event, EventQueue, ProtocolError};

use super::PingError;

bitflags::bitflags! {
    /// The states a toplevel can be in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ToplevelStates: u32 {
        /// The surface is maximized
        const MAXIMIZED = 1;
        /// The surface is fullscreen
        const FULLSCREEN = 1 << 1;
        /// The surface is being resized
        const RESIZING = 1 << 2;
        /// The surface has keyboard focus and is drawn as active
        const ACTIVATED = 1 << 3;
    }
}

impl Default for ToplevelStates {
    fn default() -> Self {
        ToplevelStates::empty()
    }
}

impl ToplevelStates {
    /// Whether the size of the surface is imposed by the compositor in this state
    pub fn is_constrained(&self) -> bool {
        self.intersects(ToplevelStates::MAXIMIZED | ToplevelStates::FULLSCREEN)
    }
}

/// State of a regular toplevel surface
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ToplevelState {
    /// The suggested size of the surface
    ///
    /// A size of `(0, 0)` lets the client pick its own size.
    pub size: Size<i32, Logical>,
    /// The states for this surface
    pub states: ToplevelStates,
}

/// State of a popup surface
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopupState {
    /// The position and size of the popup, relative to its parent
    pub geometry: Rectangle<i32, Logical>,
}

/// A configure message, as sent to a shell surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRecord<S> {
    /// The state associated with this configure
    pub state: S,
    /// A serial number to track ACK from the client
    ///
    /// The ACK-ing of a serial validates all pending lower serials.
    pub serial: Serial,
}

/// A configure message for toplevel surfaces
pub type ToplevelConfigure = ConfigureRecord<ToplevelState>;

/// A configure message for popup surfaces
pub type PopupConfigure = ConfigureRecord<PopupState>;

/// An acknowledged configure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configure {
    /// A toplevel configure
    Toplevel(ToplevelConfigure),
    /// A popup configure
    Popup(PopupConfigure),
}

impl Configure {
    /// The serial of this configure
    pub fn serial(&self) -> Serial {
        match self {
            Configure::Toplevel(configure) => configure.serial,
            Configure::Popup(configure) => configure.serial,
        }
    }
}

/// Configure handshake state of a shell role
#[derive(Debug)]
pub struct XdgRoleAttributes<S> {
    /// Defines if the surface has received at least one
    /// ack_configure from the client
    pub configured: bool,
    /// The serial of the last acked configure
    pub configure_serial: Option<Serial>,
    /// Whether the initial configure was sent to the client
    pub initial_configure_sent: bool,
    /// Configures sent to the client and waiting to be acknowledged, in send order
    pending_configures: Vec<ConfigureRecord<S>>,
    /// Holds the pending state as set by the server.
    pub server_pending: Option<S>,
    /// Holds the last state that has been acknowledged by the client,
    /// it becomes current on the next commit.
    pub last_acked: Option<S>,
    /// Holds the current state after a successful commit.
    pub current: S,
}

impl<S: Default> Default for XdgRoleAttributes<S> {
    fn default() -> Self {
        XdgRoleAttributes {
            configured: false,
            configure_serial: None,
            initial_configure_sent: false,
            pending_configures: Vec::new(),
            server_pending: None,
            last_acked: None,
            current: S::default(),
        }
    }
}

impl<S: Clone + PartialEq> XdgRoleAttributes<S> {
    /// Acknowledge a configure
    ///
    /// Every configure sent before this one is superseded and dropped. Returns `None` if
    /// the serial is not one of the pending configures.
    fn ack_configure(&mut self, serial: Serial) -> Option<ConfigureRecord<S>> {
        let configure = self
            .pending_configures
            .iter()
            .find(|configure| configure.serial == serial)?
            .clone();

        self.last_acked = Some(configure.state.clone());
        self.configured = true;
        self.configure_serial = Some(serial);
        self.pending_configures.retain(|c| c.serial > serial);

        Some(configure)
    }

    /// Gets the latest state that has been configured
    /// on the server and sent to the client.
    ///
    /// This includes sent but not yet acked or committed changes, and
    /// excludes the [`server_pending`](#structfield.server_pending) state.
    pub fn current_server_state(&self) -> &S {
        self.pending_configures
            .last()
            .map(|c| &c.state)
            .or(self.last_acked.as_ref())
            .unwrap_or(&self.current)
    }

    /// Check if the state has pending changes that have
    /// not been sent to the client.
    pub fn has_pending_changes(&self) -> bool {
        self.server_pending
            .as_ref()
            .map(|s| s != self.current_server_state())
            .unwrap_or(false)
    }

    /// Serials of the configures waiting for an ack, oldest first
    pub fn pending_serials(&self) -> impl Iterator<Item = Serial> + '_ {
        self.pending_configures.iter().map(|c| c.serial)
    }

    fn pending_state(&mut self) -> &mut S {
        let base = self.current_server_state().clone();
        self.server_pending.get_or_insert(base)
    }

    fn prepare_configure(&mut self, serials: &SerialCounter) -> ConfigureRecord<S> {
        let state = self
            .server_pending
            .take()
            .unwrap_or_else(|| self.current_server_state().clone());
        let configure = ConfigureRecord {
            state,
            serial: serials.next_serial(),
        };
        self.pending_configures.push(configure.clone());
        self.initial_configure_sent = true;
        configure
    }

    fn apply_acked(&mut self) -> bool {
        match self.last_acked.take() {
            Some(state) => {
                self.current = state;
                true
            }
            None => false,
        }
    }
}

/// Window geometry of a shell surface, double-buffered with the surface state
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SurfaceCachedState {
    /// Holds the double-buffered geometry that may be specified
    /// by xdg_surface.set_window_geometry.
    ///
    /// This excludes client-side decorations and drop shadows.
    pub geometry: Option<Rectangle<i32, Logical>>,
}

impl Cacheable for SurfaceCachedState {
    fn commit(&mut self) -> Self {
        *self
    }

    fn merge_into(self, into: &mut Self) {
        *into = self;
    }
}

/// A toplevel surface
#[derive(Debug)]
pub struct ToplevelSurface {
    surface: SurfaceId,
    client: ClientId,
    attributes: XdgRoleAttributes<ToplevelState>,
}

impl ToplevelSurface {
    /// The underlying surface
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// The client owning this toplevel
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// The configure handshake state of this toplevel
    pub fn attributes(&self) -> &XdgRoleAttributes<ToplevelState> {
        &self.attributes
    }

    /// The current, committed, state of this toplevel
    pub fn current_state(&self) -> ToplevelState {
        self.attributes.current
    }
}

/// A popup surface
#[derive(Debug)]
pub struct PopupSurface {
    surface: SurfaceId,
    client: ClientId,
    parent: SurfaceId,
    grab: Option<Serial>,
    dismissed: bool,
    attributes: XdgRoleAttributes<PopupState>,
}

impl PopupSurface {
    /// The underlying surface
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// The client owning this popup
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// The parent of this popup
    pub fn parent(&self) -> SurfaceId {
        self.parent
    }

    /// Serial of the explicit grab taken by this popup, if any
    pub fn grab(&self) -> Option<Serial> {
        self.grab
    }

    /// Whether the popup has been dismissed
    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    /// The configure handshake state of this popup
    pub fn attributes(&self) -> &XdgRoleAttributes<PopupState> {
        &self.attributes
    }
}

/// State of the xdg shell
#[derive(Debug, Default)]
pub struct XdgShellState {
    toplevels: IndexMap<SurfaceId, ToplevelSurface>,
    popups: IndexMap<SurfaceId, PopupSurface>,
    pending_pings: HashMap<ClientId, Serial>,
}

impl XdgShellState {
    /// Create a new, empty, shell state
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn new_toplevel(&mut self, surface: SurfaceId, client: ClientId) {
        trace!(surface = %surface, "new toplevel");
        self.toplevels.insert(
            surface,
            ToplevelSurface {
                surface,
                client,
                attributes: XdgRoleAttributes::default(),
            },
        );
    }

    pub(crate) fn new_popup(
        &mut self,
        surface: SurfaceId,
        client: ClientId,
        parent: SurfaceId,
        geometry: Rectangle<i32, Logical>,
    ) -> Result<(), ProtocolError> {
        if !self.is_shell_surface(parent) {
            return Err(ProtocolError::InvalidPopupParent(parent));
        }
        trace!(surface = %surface, parent = %parent, "new popup");
        let mut attributes = XdgRoleAttributes::default();
        attributes.server_pending = Some(PopupState { geometry });
        self.popups.insert(
            surface,
            PopupSurface {
                surface,
                client,
                parent,
                grab: None,
                dismissed: false,
                attributes,
            },
        );
        Ok(())
    }

    /// Whether the surface is a toplevel or a popup
    pub fn is_shell_surface(&self, surface: SurfaceId) -> bool {
        self.toplevels.contains_key(&surface) || self.popups.contains_key(&surface)
    }

    /// Access a toplevel
    pub fn toplevel(&self, surface: SurfaceId) -> Option<&ToplevelSurface> {
        self.toplevels.get(&surface)
    }

    /// Access a popup
    pub fn popup(&self, surface: SurfaceId) -> Option<&PopupSurface> {
        self.popups.get(&surface)
    }

    /// Iterate over the toplevels, in creation order
    pub fn toplevels(&self) -> impl Iterator<Item = &ToplevelSurface> {
        self.toplevels.values()
    }

    /// Whether at least one configure of this surface was acknowledged
    pub fn is_configured(&self, surface: SurfaceId) -> bool {
        if let Some(toplevel) = self.toplevels.get(&surface) {
            toplevel.attributes.configured
        } else if let Some(popup) = self.popups.get(&surface) {
            popup.attributes.configured
        } else {
            false
        }
    }

    /// Whether the initial configure of this surface was sent
    pub fn initial_configure_sent(&self, surface: SurfaceId) -> bool {
        if let Some(toplevel) = self.toplevels.get(&surface) {
            toplevel.attributes.initial_configure_sent
        } else if let Some(popup) = self.popups.get(&surface) {
            popup.attributes.initial_configure_sent
        } else {
            false
        }
    }

    /// Access the pending state of a toplevel
    ///
    /// The changes are only sent to the client with the next configure.
    pub fn with_pending_state<F, T>(&mut self, surface: SurfaceId, f: F) -> Result<T, DeadResource>
    where
        F: FnOnce(&mut ToplevelState) -> T,
    {
        let toplevel = self.toplevels.get_mut(&surface).ok_or(DeadResource)?;
        Ok(f(toplevel.attributes.pending_state()))
    }

    /// Send a configure carrying the pending state of the surface
    ///
    /// Returns the serial of the configure, or `None` if the surface is not a live shell
    /// surface.
    #[profiling::function]
    pub fn send_configure(
        &mut self,
        surface: SurfaceId,
        serials: &SerialCounter,
        events: &mut EventQueue,
    ) -> Option<Serial> {
        if let Some(toplevel) = self.toplevels.get_mut(&surface) {
            let configure = toplevel.attributes.prepare_configure(serials);
            debug!(surface = %surface, serial = %configure.serial, size = ?configure.state.size, states = ?configure.state.states, "configuring toplevel");
            events.push(Event::ToplevelConfigure {
                client: toplevel.client,
                surface,
                configure,
            });
            Some(configure.serial)
        } else if let Some(popup) = self.popups.get_mut(&surface) {
            if popup.dismissed {
                return None;
            }
            let configure = popup.attributes.prepare_configure(serials);
            debug!(surface = %surface, serial = %configure.serial, geometry = ?configure.state.geometry, "configuring popup");
            events.push(Event::PopupConfigure {
                client: popup.client,
                surface,
                configure,
            });
            Some(configure.serial)
        } else {
            None
        }
    }

    /// Send a configure if the initial one was not sent yet, or if the pending state differs
    /// from the last one sent
    pub fn send_pending_configure(
        &mut self,
        surface: SurfaceId,
        serials: &SerialCounter,
        events: &mut EventQueue,
    ) -> Option<Serial> {
        let needed = if let Some(toplevel) = self.toplevels.get(&surface) {
            !toplevel.attributes.initial_configure_sent || toplevel.attributes.has_pending_changes()
        } else if let Some(popup) = self.popups.get(&surface) {
            !popup.attributes.initial_configure_sent || popup.attributes.has_pending_changes()
        } else {
            false
        };
        if needed {
            self.send_configure(surface, serials, events)
        } else {
            None
        }
    }

    /// Process an ack_configure from the client
    #[profiling::function]
    pub(crate) fn ack_configure(&mut self, surface: SurfaceId, serial: Serial) -> Result<Configure, ProtocolError> {
        let acked = if let Some(toplevel) = self.toplevels.get_mut(&surface) {
            toplevel.attributes.ack_configure(serial).map(Configure::Toplevel)
        } else if let Some(popup) = self.popups.get_mut(&surface) {
            popup.attributes.ack_configure(serial).map(Configure::Popup)
        } else {
            return Err(ProtocolError::NotConstructed(surface));
        };
        acked.ok_or(ProtocolError::InvalidConfigureSerial { surface, serial })
    }

    /// Promote the last acknowledged state to current, on commit of the surface
    pub(crate) fn apply_commit(&mut self, surface: SurfaceId) -> bool {
        if let Some(toplevel) = self.toplevels.get_mut(&surface) {
            toplevel.attributes.apply_acked()
        } else if let Some(popup) = self.popups.get_mut(&surface) {
            popup.attributes.apply_acked()
        } else {
            false
        }
    }

    /// Ask a toplevel to close
    pub fn send_close(&self, surface: SurfaceId, events: &mut EventQueue) -> Result<(), DeadResource> {
        let toplevel = self.toplevels.get(&surface).ok_or(DeadResource)?;
        events.push(Event::Close {
            client: toplevel.client,
            surface,
        });
        Ok(())
    }

    /// Send a ping to a client
    ///
    /// Only one ping may be pending per client.
    pub fn send_ping(
        &mut self,
        client: ClientId,
        serials: &SerialCounter,
        events: &mut EventQueue,
    ) -> Result<Serial, PingError> {
        if let Some(pending) = self.pending_pings.get(&client) {
            return Err(PingError::PingAlreadyPending(*pending));
        }
        let serial = serials.next_serial();
        self.pending_pings.insert(client, serial);
        events.push(Event::Ping { client, serial });
        Ok(serial)
    }

    /// The ping still waiting for an answer from this client
    pub fn pending_ping(&self, client: ClientId) -> Option<Serial> {
        self.pending_pings.get(&client).copied()
    }

    /// Process a pong, returns `false` if it does not answer the pending ping
    pub(crate) fn client_pong(&mut self, client: ClientId, serial: Serial) -> bool {
        match self.pending_pings.get(&client) {
            Some(pending) if *pending == serial => {
                self.pending_pings.remove(&client);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn grab_popup(&mut self, surface: SurfaceId, serial: Serial) -> Result<(), ProtocolError> {
        let popup = self
            .popups
            .get_mut(&surface)
            .ok_or(ProtocolError::NotAPopup(surface))?;
        popup.grab = Some(serial);
        Ok(())
    }

    /// Dismiss a popup, and every popup stacked on top of it
    ///
    /// The topmost popups are dismissed first.
    pub fn dismiss_popup(&mut self, surface: SurfaceId, events: &mut EventQueue) {
        let children = self
            .popups
            .values()
            .filter(|popup| popup.parent == surface && !popup.dismissed)
            .map(|popup| popup.surface)
            .collect::<Vec<_>>();
        for child in children {
            self.dismiss_popup(child, events);
        }
        if let Some(popup) = self.popups.get_mut(&surface) {
            if !popup.dismissed {
                popup.dismissed = true;
                popup.grab = None;
                debug!(surface = %surface, "popup dismissed");
                events.push(Event::PopupDone {
                    client: popup.client,
                    surface,
                });
            }
        }
    }

    pub(crate) fn surface_destroyed(&mut self, surface: SurfaceId, events: &mut EventQueue) {
        let children = self
            .popups
            .values()
            .filter(|popup| popup.parent == surface)
            .map(|popup| popup.surface)
            .collect::<Vec<_>>();
        for child in children {
            self.dismiss_popup(child, events);
        }
        self.toplevels.shift_remove(&surface);
        self.popups.shift_remove(&surface);
    }

    pub(crate) fn client_disconnected(&mut self, client: ClientId) {
        self.toplevels.retain(|_, toplevel| toplevel.client != client);
        self.popups.retain(|_, popup| popup.client != client);
        self.pending_pings.remove(&client);
    }
}
