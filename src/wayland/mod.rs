//! Protocol-related utilities
//!
//! This module contains the compositor side of the protocol state machines. They are all
//! owned by a single [`CompositorState`], which is the only entry point for client requests
//! and compositor-side actions alike:
//!
//! - client requests are fed through [`CompositorState::handle_request`], in the order they
//!   were received
//! - input is fed through [`CompositorState::pointer_motion`],
//!   [`CompositorState::pointer_button`] and [`CompositorState::set_keyboard_focus`]
//! - every resulting event is queued, and must be drained with
//!   [`CompositorState::drain_events`] and delivered by the transport layer
//!
//! Objects are referred to by the handles of [`crate::utils::ids`]. Destroying an object
//! (or disconnecting its client) invalidates every reference to it held by the other
//! components before the call returns.
//!
//! ```
//! use waysync::backend::buffer::ShmIntegration;
//! use waysync::wayland::{CompositorConfig, CompositorState};
//!
//! let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
//! let client = state.connect_client();
//! let surface = state.create_surface(client).unwrap();
//! assert!(!state.is_exposable(surface));
//! ```

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, instrument, trace, warn};

use crate::backend::buffer::{BufferDescriptor, BufferError, ClientBufferIntegration};
use crate::input::pointer::{ButtonEvent, ButtonState, PointerFocus};
use crate::input::{KeyboardFocusProvider, Seat};
use crate::utils::{
    BufferHandle, ClientId, DeadResource, IdGenerator, Logical, Point, Rectangle, Serial, SerialCounter, Size, SourceId,
    SurfaceId,
};

pub mod client;
pub mod compositor;
pub mod protocol;
pub mod selection;
pub mod shell;

pub use self::protocol::{Event, EventQueue, Outcome, ProtocolError, Request};

use self::client::ClientRegistry;
use self::compositor::roles::RoleParams;
use self::compositor::{BufferAssignment, CommitOutcome, SurfaceAttributes, SurfaceData};
use self::selection::{DataDeviceState, SourceMetadata};
use self::shell::xdg::{SurfaceCachedState, ToplevelState, ToplevelStates, XdgShellState};
use self::shell::PingError;

/// Configuration of a [`CompositorState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositorConfig {
    /// Size given to toplevels that ask to be maximized or fullscreen
    pub output_size: Size<i32, Logical>,
    /// Send the initial configure of a shell surface automatically, the first time it
    /// commits
    pub send_initial_configure: bool,
    /// The first serial handed out
    pub initial_serial: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        CompositorConfig {
            output_size: (1600, 1200).into(),
            send_initial_configure: true,
            initial_serial: 1,
        }
    }
}

/// The state of the compositor
#[derive(Debug)]
pub struct CompositorState {
    config: CompositorConfig,
    serials: SerialCounter,
    ids: IdGenerator,
    clients: ClientRegistry,
    surfaces: IndexMap<SurfaceId, SurfaceData>,
    buffer_owners: HashMap<BufferHandle, ClientId>,
    xdg: XdgShellState,
    data_device: DataDeviceState,
    seat: Seat,
    buffers: Box<dyn ClientBufferIntegration>,
    events: EventQueue,
}

/// Resolve a surface referenced by a request of `client`
fn owned_surface(
    surfaces: &mut IndexMap<SurfaceId, SurfaceData>,
    client: ClientId,
    surface: SurfaceId,
) -> Result<&mut SurfaceData, ProtocolError> {
    let data = surfaces
        .get_mut(&surface)
        .ok_or(ProtocolError::UnknownSurface(surface))?;
    if data.client() != client {
        return Err(ProtocolError::ForeignObject(surface.to_string()));
    }
    Ok(data)
}

impl CompositorState {
    /// Create a new compositor state, using the given buffer integration
    pub fn new<B>(config: CompositorConfig, buffers: B) -> Self
    where
        B: ClientBufferIntegration + 'static,
    {
        debug!(buffers = buffers.name(), ?config, "creating compositor state");
        CompositorState {
            config,
            serials: SerialCounter::new(config.initial_serial),
            ids: IdGenerator::default(),
            clients: ClientRegistry::default(),
            surfaces: IndexMap::new(),
            buffer_owners: HashMap::new(),
            xdg: XdgShellState::new(),
            data_device: DataDeviceState::new(),
            seat: Seat::new("seat0"),
            buffers: Box::new(buffers),
            events: EventQueue::default(),
        }
    }

    /// The configuration of this state
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// The serial counter of this state
    pub fn serial_counter(&self) -> &SerialCounter {
        &self.serials
    }

    /// The connected clients
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Access a surface
    pub fn surface(&self, surface: SurfaceId) -> Option<&SurfaceData> {
        self.surfaces.get(&surface)
    }

    /// The xdg shell state
    pub fn xdg(&self) -> &XdgShellState {
        &self.xdg
    }

    /// The data device state
    pub fn data_device(&self) -> &DataDeviceState {
        &self.data_device
    }

    /// The seat
    pub fn seat(&self) -> &Seat {
        &self.seat
    }

    /// The active buffer integration
    pub fn buffers(&self) -> &dyn ClientBufferIntegration {
        self.buffers.as_ref()
    }

    /// Drain the queued events, in emission order
    pub fn drain_events(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain()
    }

    /// Register a new client connection
    pub fn connect_client(&mut self) -> ClientId {
        let client: ClientId = self.ids.next();
        debug!(client = %client, "client connected");
        self.clients.insert(client);
        client
    }

    /// Disconnect a client, destroying all of its objects
    pub fn disconnect_client(&mut self, client: ClientId) {
        if !self.clients.contains(client) {
            return;
        }
        debug!(client = %client, "client disconnected");

        let owned = self
            .surfaces
            .values()
            .filter(|surface| surface.client() == client)
            .map(|surface| surface.id())
            .collect::<Vec<_>>();
        for surface in owned {
            self.destroy_surface(surface);
        }
        self.xdg.client_disconnected(client);
        if self.data_device.client_disconnected(client, &self.ids, &mut self.events) {
            self.seat.pointer_mut().end_dnd_grab();
        }
        self.seat.pointer_mut().client_disconnected(client);
        if self.seat.keyboard_mut().client_disconnected(client) {
            self.data_device.set_selection_focus(None, &self.ids, &mut self.events);
        }

        let buffers = self
            .buffer_owners
            .iter()
            .filter(|(_, owner)| **owner == client)
            .map(|(buffer, _)| *buffer)
            .collect::<Vec<_>>();
        for buffer in buffers {
            self.buffer_owners.remove(&buffer);
            self.buffers.release(buffer);
        }
        self.clients.remove(client);
    }

    /// Create a new surface for a client
    pub fn create_surface(&mut self, client: ClientId) -> Result<SurfaceId, DeadResource> {
        if !self.clients.contains(client) {
            return Err(DeadResource);
        }
        let surface: SurfaceId = self.ids.next();
        trace!(client = %client, surface = %surface, "new surface");
        self.surfaces.insert(surface, SurfaceData::new(surface, client));
        Ok(surface)
    }

    /// Import a buffer created by a client, through the active buffer integration
    pub fn import_buffer(
        &mut self,
        client: ClientId,
        descriptor: BufferDescriptor,
    ) -> Result<BufferHandle, BufferError> {
        if !self.clients.contains(client) {
            return Err(BufferError::DeadClient);
        }
        let handle: BufferHandle = self.ids.next();
        self.buffers.import(handle, descriptor)?;
        self.buffer_owners.insert(handle, client);
        Ok(handle)
    }

    /// Create a data source for a client, offering the given mime types
    pub fn create_data_source<I, M>(&mut self, client: ClientId, mime_types: I) -> Result<SourceId, DeadResource>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        if !self.clients.contains(client) {
            return Err(DeadResource);
        }
        let source: SourceId = self.ids.next();
        let metadata = SourceMetadata {
            mime_types: mime_types.into_iter().map(Into::into).collect(),
        };
        self.data_device.create_source(source, client, metadata);
        Ok(source)
    }

    /// Bind the data device of a client
    ///
    /// Clients only receive selection and drag'n'drop events once they bound it.
    pub fn bind_data_device(&mut self, client: ClientId) {
        if self.clients.contains(client) {
            self.data_device.bind_data_device(client, &self.ids, &mut self.events);
        }
    }

    /// Process a request of a client
    ///
    /// A request that is a protocol violation is reported to the client, which is then
    /// disconnected.
    #[instrument(level = "trace", skip_all, fields(client = %client))]
    pub fn handle_request(&mut self, client: ClientId, request: Request) -> Outcome {
        if !self.clients.contains(client) {
            debug!("request from a disconnected client");
            return Outcome::Ignored;
        }
        trace!(?request, "processing request");

        let outcome = self.dispatch_request(client, request).unwrap_or_else(Outcome::ClientFault);
        match &outcome {
            Outcome::Handled => {}
            Outcome::Ignored => debug!("request ignored"),
            Outcome::ClientFault(error) => {
                warn!(client = %client, %error, "protocol error");
                self.events.push(Event::ProtocolError {
                    client,
                    error: error.clone(),
                });
                self.disconnect_client(client);
            }
        }
        outcome
    }

    fn dispatch_request(&mut self, client: ClientId, request: Request) -> Result<Outcome, ProtocolError> {
        match request {
            Request::Attach {
                surface,
                buffer,
                offset,
            } => {
                let assignment = match buffer {
                    Some(buffer) => {
                        match self.buffer_owners.get(&buffer) {
                            None => return Err(ProtocolError::UnknownBuffer(buffer)),
                            Some(owner) if *owner != client => {
                                return Err(ProtocolError::ForeignObject(buffer.to_string()))
                            }
                            Some(_) => {}
                        }
                        BufferAssignment::NewBuffer { buffer, offset }
                    }
                    None => BufferAssignment::Removed,
                };
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                data.cached_state().pending::<SurfaceAttributes>().buffer = Some(assignment);
                Ok(Outcome::Handled)
            }
            Request::Damage { surface, damage } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                data.cached_state().pending::<SurfaceAttributes>().damage.push(damage);
                Ok(Outcome::Handled)
            }
            Request::SetInputRegion { surface, region } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                data.cached_state().pending::<SurfaceAttributes>().input_region = region;
                Ok(Outcome::Handled)
            }
            Request::SetOpaqueRegion { surface, region } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                data.cached_state().pending::<SurfaceAttributes>().opaque_region = region;
                Ok(Outcome::Handled)
            }
            Request::SetBufferScale { surface, scale } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                if scale <= 0 {
                    return Err(ProtocolError::InvalidScale(scale));
                }
                data.cached_state().pending::<SurfaceAttributes>().buffer_scale = scale;
                Ok(Outcome::Handled)
            }
            Request::SetBufferTransform { surface, transform } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                data.cached_state().pending::<SurfaceAttributes>().buffer_transform = transform;
                Ok(Outcome::Handled)
            }
            Request::Frame { surface, callback } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                data.cached_state()
                    .pending::<SurfaceAttributes>()
                    .frame_callbacks
                    .push(callback);
                Ok(Outcome::Handled)
            }
            Request::Commit { surface } => self.commit(client, surface),
            Request::DestroySurface { surface } => {
                owned_surface(&mut self.surfaces, client, surface)?;
                self.destroy_surface(surface);
                Ok(Outcome::Handled)
            }
            Request::SetRole { surface, role } => self.set_role(client, surface, role),
            Request::SetWindowGeometry { surface, geometry } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                if !self.xdg.is_shell_surface(surface) {
                    return Err(ProtocolError::NotConstructed(surface));
                }
                data.cached_state().pending::<SurfaceCachedState>().geometry = Some(geometry);
                Ok(Outcome::Handled)
            }
            Request::AckConfigure { surface, serial } => {
                let data = owned_surface(&mut self.surfaces, client, surface)?;
                let configure = self.xdg.ack_configure(surface, serial)?;
                trace!(surface = %surface, serial = %configure.serial(), "configure acknowledged");
                data.mark_configured();
                if data.unblock() {
                    self.xdg.apply_commit(surface);
                    if data.is_mapped() {
                        self.events.push(Event::Committed { surface });
                    }
                }
                Ok(Outcome::Handled)
            }
            Request::Pong { serial } => {
                if self.xdg.client_pong(client, serial) {
                    trace!(serial = %serial, "pong received");
                    Ok(Outcome::Handled)
                } else {
                    Ok(Outcome::Ignored)
                }
            }
            Request::SetMaximized { surface } => self.toplevel_request(client, surface, |state, output| {
                state.states.insert(ToplevelStates::MAXIMIZED);
                state.size = output;
            }),
            Request::UnsetMaximized { surface } => self.toplevel_request(client, surface, |state, output| {
                state.states.remove(ToplevelStates::MAXIMIZED);
                state.size = restored_size(state, output);
            }),
            Request::SetFullscreen { surface } => self.toplevel_request(client, surface, |state, output| {
                state.states.insert(ToplevelStates::FULLSCREEN);
                state.size = output;
            }),
            Request::UnsetFullscreen { surface } => self.toplevel_request(client, surface, |state, output| {
                state.states.remove(ToplevelStates::FULLSCREEN);
                state.size = restored_size(state, output);
            }),
            Request::SetMinimized { surface } => {
                owned_surface(&mut self.surfaces, client, surface)?;
                if self.xdg.toplevel(surface).is_none() {
                    return Err(ProtocolError::NotAToplevel(surface));
                }
                self.events.push(Event::MinimizeRequested { surface });
                Ok(Outcome::Handled)
            }
            Request::PopupGrab { surface, serial } => {
                owned_surface(&mut self.surfaces, client, surface)?;
                if self.xdg.popup(surface).is_none() {
                    return Err(ProtocolError::NotAPopup(surface));
                }
                let pointer = self.seat.get_pointer();
                if pointer.has_grab(serial) && !pointer.pressed_buttons().is_empty() {
                    self.xdg.grab_popup(surface, serial)?;
                    Ok(Outcome::Handled)
                } else {
                    debug!(surface = %surface, serial = %serial, "popup grab with an invalid serial");
                    self.xdg.dismiss_popup(surface, &mut self.events);
                    Ok(Outcome::Ignored)
                }
            }
            Request::StartDrag {
                source,
                origin,
                icon,
                serial,
            } => self.start_drag(client, source, origin, icon, serial),
            Request::SetSelection { source, serial } => {
                trace!(serial = %serial, source = ?source, "set_selection");
                Ok(self
                    .data_device
                    .set_selection(client, source, &self.ids, &mut self.events))
            }
            Request::OfferReceive { offer, mime_type } => Ok(self
                .data_device
                .offer_receive(client, offer, mime_type, &mut self.events)),
            Request::DestroyOffer { offer } => Ok(self.data_device.destroy_offer(client, offer)),
            Request::DestroySource { source } => {
                if self
                    .data_device
                    .source_destroyed(client, source, &self.ids, &mut self.events)?
                {
                    self.seat.pointer_mut().end_dnd_grab();
                }
                Ok(Outcome::Handled)
            }
            Request::MapClientToProcess { process_id } => {
                self.clients.map_to_process(client, process_id);
                Ok(Outcome::Handled)
            }
            Request::AuthenticateWithToken { token } => {
                if self.clients.authenticate(client, token) {
                    debug!(client = %client, "client authenticated");
                    self.events.push(Event::ClientAuthenticated { client });
                }
                Ok(Outcome::Handled)
            }
            Request::UpdateWindowProperty { surface, name, value } => {
                owned_surface(&mut self.surfaces, client, surface)?;
                self.clients
                    .set_window_property(client, surface, name.clone(), value.clone());
                self.events.push(Event::WindowPropertyChanged {
                    client,
                    surface,
                    name,
                    value,
                });
                Ok(Outcome::Handled)
            }
        }
    }

    #[profiling::function]
    fn commit(&mut self, client: ClientId, surface: SurfaceId) -> Result<Outcome, ProtocolError> {
        let data = owned_surface(&mut self.surfaces, client, surface)?;
        let gate_open = match data.role() {
            Some(role) if role.requires_configure() => self.xdg.is_configured(surface),
            _ => true,
        };

        match data.commit(gate_open) {
            CommitOutcome::Applied => {
                self.xdg.apply_commit(surface);
                if data.is_mapped() {
                    trace!(surface = %surface, "commit applied");
                    self.events.push(Event::Committed { surface });
                }
            }
            CommitOutcome::Blocked => {
                if self.config.send_initial_configure && !self.xdg.initial_configure_sent(surface) {
                    self.xdg.send_configure(surface, &self.serials, &mut self.events);
                }
            }
        }
        Ok(Outcome::Handled)
    }

    fn set_role(&mut self, client: ClientId, surface: SurfaceId, role: RoleParams) -> Result<Outcome, ProtocolError> {
        if let RoleParams::Popup { parent, .. } = role {
            if !self.xdg.is_shell_surface(parent) {
                return Err(ProtocolError::InvalidPopupParent(parent));
            }
        }
        let data = owned_surface(&mut self.surfaces, client, surface)?;
        match data.give_role(role.role()) {
            Ok(true) => {}
            Ok(false) => {
                debug!(surface = %surface, role = %role.role(), "surface already has this role");
                return Ok(Outcome::Ignored);
            }
            Err(err) => {
                return Err(ProtocolError::RoleAlreadyAssigned {
                    surface,
                    existing: err.existing,
                })
            }
        }

        match role {
            RoleParams::Toplevel => self.xdg.new_toplevel(surface, client),
            RoleParams::Popup { parent, geometry } => self.xdg.new_popup(surface, client, parent, geometry)?,
        }
        Ok(Outcome::Handled)
    }

    fn toplevel_request<F>(&mut self, client: ClientId, surface: SurfaceId, f: F) -> Result<Outcome, ProtocolError>
    where
        F: FnOnce(&mut ToplevelState, Size<i32, Logical>),
    {
        owned_surface(&mut self.surfaces, client, surface)?;
        let output_size = self.config.output_size;
        self.xdg
            .with_pending_state(surface, |state| f(state, output_size))
            .map_err(|_| ProtocolError::NotAToplevel(surface))?;
        if self.xdg.initial_configure_sent(surface) {
            self.xdg
                .send_pending_configure(surface, &self.serials, &mut self.events);
        }
        Ok(Outcome::Handled)
    }

    fn start_drag(
        &mut self,
        client: ClientId,
        source: Option<SourceId>,
        origin: SurfaceId,
        icon: Option<SurfaceId>,
        serial: Serial,
    ) -> Result<Outcome, ProtocolError> {
        owned_surface(&mut self.surfaces, client, origin)?;
        if let Some(icon) = icon {
            owned_surface(&mut self.surfaces, client, icon)?;
        }

        let outcome = self.data_device.start_drag(
            client,
            source,
            origin,
            icon,
            serial,
            self.seat.get_pointer(),
            &mut self.events,
        );
        if outcome.is_handled() {
            self.seat.pointer_mut().start_dnd_grab();
            let pointer = self.seat.get_pointer();
            let focus = pointer.current_focus();
            let location = pointer.current_location();
            self.data_device
                .drag_motion(focus, location, 0, &self.serials, &self.ids, &mut self.events);
        }
        Ok(outcome)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        let Some(data) = self.surfaces.shift_remove(&surface) else {
            return;
        };
        trace!(surface = %surface, "surface destroyed");
        self.xdg.surface_destroyed(surface, &mut self.events);
        if self.data_device.surface_destroyed(surface, &mut self.events) {
            self.seat.pointer_mut().end_dnd_grab();
        }
        self.seat.pointer_mut().surface_destroyed(surface);
        if self.seat.keyboard_mut().surface_destroyed(surface) {
            self.data_device.set_selection_focus(None, &self.ids, &mut self.events);
        }
        self.clients.surface_destroyed(data.client(), surface);
    }

    /// Send a configure to a shell surface
    ///
    /// For toplevels, `size` and `states` replace the pending state first. A size of
    /// `(0, 0)` lets the client pick its own size. Popups ignore both and are configured
    /// with the geometry given at role assignment. Returns `None` if the surface is not a
    /// live shell surface.
    pub fn send_configure(
        &mut self,
        surface: SurfaceId,
        size: Size<i32, Logical>,
        states: ToplevelStates,
    ) -> Option<Serial> {
        if self.xdg.toplevel(surface).is_some() {
            self.xdg
                .with_pending_state(surface, |state| {
                    state.size = size;
                    state.states = states;
                })
                .ok()?;
        }
        self.xdg.send_configure(surface, &self.serials, &mut self.events)
    }

    /// Ask a toplevel to close
    pub fn send_close(&mut self, surface: SurfaceId) -> Result<(), DeadResource> {
        self.xdg.send_close(surface, &mut self.events)
    }

    /// Send a ping to a client
    pub fn send_ping(&mut self, client: ClientId) -> Result<Serial, PingError> {
        if !self.clients.contains(client) {
            return Err(PingError::DeadClient);
        }
        self.xdg.send_ping(client, &self.serials, &mut self.events)
    }

    /// Set a window property of a surface, notifying its client
    pub fn set_window_property(
        &mut self,
        surface: SurfaceId,
        name: impl Into<String>,
        value: Vec<u8>,
    ) -> Result<(), DeadResource> {
        let client = self.surfaces.get(&surface).ok_or(DeadResource)?.client();
        let name = name.into();
        self.clients
            .set_window_property(client, surface, name.clone(), value.clone());
        self.events.push(Event::WindowProperty {
            client,
            surface,
            name,
            value,
        });
        Ok(())
    }

    /// Move the keyboard focus, `None` removing it
    ///
    /// The selection is re-announced when the focus moves to another client.
    pub fn set_keyboard_focus(&mut self, surface: Option<SurfaceId>) {
        let focus = surface.and_then(|surface| self.surfaces.get(&surface).map(|data| (surface, data.client())));
        if surface.is_some() && focus.is_none() {
            warn!(surface = ?surface, "keyboard focus on an unknown surface");
        }
        if self.seat.keyboard_mut().set_focus(focus) {
            let client = self.seat.get_keyboard().focused_client();
            self.data_device
                .set_selection_focus(client, &self.ids, &mut self.events);
        }
    }

    /// Notify the pointer moved
    ///
    /// `under` is the surface under the pointer along with its location in the global
    /// compositor space, as computed by the window management.
    pub fn pointer_motion(
        &mut self,
        location: Point<f64, Logical>,
        under: Option<(SurfaceId, Point<f64, Logical>)>,
        time: u32,
    ) {
        let focus = under.and_then(|(surface, origin)| {
            self.surfaces.get(&surface).map(|data| PointerFocus {
                surface,
                client: data.client(),
                origin,
            })
        });
        self.seat.pointer_mut().motion(location, focus);
        if self.data_device.is_dragging() {
            self.data_device
                .drag_motion(focus, location, time, &self.serials, &self.ids, &mut self.events);
        }
    }

    /// Notify a pointer button changed state
    ///
    /// Returns the serial of the button event, which clients use to start grabs.
    pub fn pointer_button(&mut self, button: u32, state: ButtonState, time: u32) -> Serial {
        let serial = self.serials.next_serial();
        self.seat.pointer_mut().button(&ButtonEvent {
            serial,
            time,
            button,
            state,
        });
        if state == ButtonState::Released
            && self.data_device.is_dragging()
            && self.data_device.drag_button_released(button, &mut self.events)
        {
            self.seat.pointer_mut().end_dnd_grab();
        }
        serial
    }

    /// Send the frame callbacks of every surface
    pub fn send_frame_callbacks(&mut self, time: u32) {
        for data in self.surfaces.values_mut() {
            let client = data.client();
            for callback in data.take_frame_callbacks() {
                self.events.push(Event::FrameDone { client, callback, time });
            }
        }
    }

    /// Whether the content of a surface may be presented
    ///
    /// Shell surfaces only become exposable once they acknowledged a configure, and stay
    /// exposable afterwards.
    pub fn is_exposable(&self, surface: SurfaceId) -> bool {
        match self.surfaces.get(&surface) {
            Some(data) => match data.role() {
                Some(role) if role.requires_configure() => self.xdg.is_configured(surface),
                _ => true,
            },
            None => false,
        }
    }

    /// Size of the committed content of a surface
    pub fn surface_size(&self, surface: SurfaceId) -> Option<Size<i32, Logical>> {
        self.surfaces.get(&surface)?.surface_size(self.buffers.as_ref())
    }

    /// Committed window geometry of a shell surface
    pub fn window_geometry(&self, surface: SurfaceId) -> Option<Rectangle<i32, Logical>> {
        self.surfaces
            .get(&surface)?
            .cached_state()
            .current::<SurfaceCachedState>()
            .geometry
    }
}

fn restored_size(state: &ToplevelState, output: Size<i32, Logical>) -> Size<i32, Logical> {
    if state.states.is_constrained() {
        output
    } else {
        (0, 0).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::buffer::{ShmFormat, ShmIntegration};

    fn shm_buffer(state: &mut CompositorState, client: ClientId) -> BufferHandle {
        state
            .import_buffer(
                client,
                BufferDescriptor::Shm {
                    offset: 0,
                    width: 32,
                    height: 32,
                    stride: 128,
                    format: ShmFormat::Argb8888,
                },
            )
            .unwrap()
    }

    #[test]
    fn faults_disconnect_the_client() {
        let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
        let client = state.connect_client();
        let surface = state.create_surface(client).unwrap();
        assert!(state
            .handle_request(
                client,
                Request::SetRole {
                    surface,
                    role: RoleParams::Toplevel,
                },
            )
            .is_handled());

        let outcome = state.handle_request(
            client,
            Request::AckConfigure {
                surface,
                serial: Serial::from(42),
            },
        );
        assert!(matches!(
            outcome,
            Outcome::ClientFault(ProtocolError::InvalidConfigureSerial { .. })
        ));
        let events = state.drain_events().collect::<Vec<_>>();
        assert!(matches!(events.last(), Some(Event::ProtocolError { .. })));
        assert!(!state.clients().contains(client));
        assert!(state.surface(surface).is_none());
        assert_eq!(state.handle_request(client, Request::Commit { surface }), Outcome::Ignored);
    }

    #[test]
    fn second_role_is_rejected() {
        let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
        let client = state.connect_client();
        let parent = state.create_surface(client).unwrap();
        let surface = state.create_surface(client).unwrap();
        let _ = state.handle_request(
            client,
            Request::SetRole {
                surface: parent,
                role: RoleParams::Toplevel,
            },
        );
        let _ = state.handle_request(
            client,
            Request::SetRole {
                surface,
                role: RoleParams::Toplevel,
            },
        );
        assert_eq!(
            state.handle_request(
                client,
                Request::SetRole {
                    surface,
                    role: RoleParams::Toplevel,
                },
            ),
            Outcome::Ignored
        );
        assert_eq!(
            state.handle_request(
                client,
                Request::SetRole {
                    surface,
                    role: RoleParams::Popup {
                        parent,
                        geometry: Rectangle::from_loc_and_size((0, 0), (10, 10)),
                    },
                },
            ),
            Outcome::ClientFault(ProtocolError::RoleAlreadyAssigned {
                surface,
                existing: crate::wayland::compositor::roles::Role::Toplevel,
            })
        );
    }

    #[test]
    fn foreign_buffers_are_rejected() {
        let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
        let owner = state.connect_client();
        let other = state.connect_client();
        let buffer = shm_buffer(&mut state, owner);
        let surface = state.create_surface(other).unwrap();
        assert!(matches!(
            state.handle_request(
                other,
                Request::Attach {
                    surface,
                    buffer: Some(buffer),
                    offset: (0, 0).into(),
                },
            ),
            Outcome::ClientFault(ProtocolError::ForeignObject(_))
        ));

        state.disconnect_client(owner);
        assert_eq!(state.buffers().buffer_size(buffer), None);
    }

    #[test]
    fn roleless_surfaces_commit_immediately() {
        let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
        let client = state.connect_client();
        let surface = state.create_surface(client).unwrap();
        let buffer = shm_buffer(&mut state, client);
        let _ = state.handle_request(
            client,
            Request::Attach {
                surface,
                buffer: Some(buffer),
                offset: (0, 0).into(),
            },
        );
        let _ = state.handle_request(client, Request::SetBufferScale { surface, scale: 2 });
        let _ = state.handle_request(client, Request::Frame { surface, callback: 7 });
        let _ = state.handle_request(client, Request::Commit { surface });
        assert_eq!(state.surface_size(surface), Some((16, 16).into()));

        state.send_frame_callbacks(1234);
        let events = state.drain_events().collect::<Vec<_>>();
        assert_eq!(
            events,
            vec![
                Event::Committed { surface },
                Event::FrameDone {
                    client,
                    callback: 7,
                    time: 1234
                },
            ]
        );
    }

    #[test]
    fn popups_keep_their_geometry_on_configure() {
        let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
        let client = state.connect_client();
        let parent = state.create_surface(client).unwrap();
        let popup = state.create_surface(client).unwrap();
        let geometry = Rectangle::from_loc_and_size((5, 5), (20, 20));
        let _ = state.handle_request(
            client,
            Request::SetRole {
                surface: parent,
                role: RoleParams::Toplevel,
            },
        );
        let _ = state.handle_request(
            client,
            Request::SetRole {
                surface: popup,
                role: RoleParams::Popup { parent, geometry },
            },
        );
        let _ = state.drain_events().count();

        let serial = state
            .send_configure(popup, (300, 300).into(), ToplevelStates::MAXIMIZED)
            .unwrap();
        match state.drain_events().collect::<Vec<_>>().as_slice() {
            [Event::PopupConfigure { configure, .. }] => {
                assert_eq!(configure.serial, serial);
                assert_eq!(configure.state.geometry, geometry);
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn popup_grab_needs_a_held_button() {
        let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
        let client = state.connect_client();
        let parent = state.create_surface(client).unwrap();
        let popup = state.create_surface(client).unwrap();
        let _ = state.handle_request(
            client,
            Request::SetRole {
                surface: parent,
                role: RoleParams::Toplevel,
            },
        );
        let _ = state.handle_request(
            client,
            Request::SetRole {
                surface: popup,
                role: RoleParams::Popup {
                    parent,
                    geometry: Rectangle::from_loc_and_size((5, 5), (20, 20)),
                },
            },
        );

        state.pointer_motion((10.0, 10.0).into(), Some((parent, (0.0, 0.0).into())), 1);
        let serial = state.pointer_button(0x110, ButtonState::Pressed, 2);
        assert!(state
            .handle_request(client, Request::PopupGrab { surface: popup, serial })
            .is_handled());
        assert_eq!(state.xdg().popup(popup).unwrap().grab(), Some(serial));

        let _ = state.pointer_button(0x110, ButtonState::Released, 3);
        let _ = state.drain_events().count();
        assert_eq!(
            state.handle_request(client, Request::PopupGrab { surface: popup, serial }),
            Outcome::Ignored
        );
        assert_eq!(
            state.drain_events().collect::<Vec<_>>(),
            vec![Event::PopupDone { client, surface: popup }]
        );
    }

    #[test]
    fn window_properties_are_reported() {
        let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
        let client = state.connect_client();
        let surface = state.create_surface(client).unwrap();
        let _ = state.handle_request(
            client,
            Request::AuthenticateWithToken {
                token: "token".into(),
            },
        );
        let _ = state.handle_request(
            client,
            Request::UpdateWindowProperty {
                surface,
                name: "title".into(),
                value: b"demo".to_vec(),
            },
        );
        state.set_window_property(surface, "opacity", vec![255]).unwrap();

        let events = state.drain_events().collect::<Vec<_>>();
        assert_eq!(events[0], Event::ClientAuthenticated { client });
        assert!(matches!(&events[1], Event::WindowPropertyChanged { name, .. } if name == "title"));
        assert!(matches!(&events[2], Event::WindowProperty { name, .. } if name == "opacity"));
        assert_eq!(
            state.clients().get(client).unwrap().window_property(surface, "opacity"),
            Some(&[255u8][..])
        );
    }
}
