//! Typed protocol messages
//!
//! The transport layer (socket, wire marshalling, object demultiplexing) is not part of this
//! crate. It hands every decoded client request to
//! [`CompositorState::handle_request`](super::CompositorState::handle_request) as a
//! [`Request`], and drains the outgoing [`Event`]s from the [`EventQueue`] after each call.

use std::collections::VecDeque;

use thiserror::Error;

use crate::utils::{BufferHandle, ClientId, Logical, OfferId, Point, Rectangle, Serial, SourceId, SurfaceId};

use super::compositor::{roles::Role, roles::RoleParams, RegionAttributes, Transform};
use super::shell::xdg::{PopupConfigure, ToplevelConfigure};

/// Requests a client can send
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Attach a buffer to the surface, or detach the current one with `None`
    Attach {
        /// target surface
        surface: SurfaceId,
        /// the buffer
        buffer: Option<BufferHandle>,
        /// offset of the new buffer relative to the current one
        offset: Point<i32, Logical>,
    },
    /// Mark part of the surface as damaged
    Damage {
        /// target surface
        surface: SurfaceId,
        /// damaged area, in surface coordinates
        damage: Rectangle<i32, Logical>,
    },
    /// Set the input region of the surface
    SetInputRegion {
        /// target surface
        surface: SurfaceId,
        /// the region, `None` meaning the whole surface
        region: Option<RegionAttributes>,
    },
    /// Set the opaque region of the surface
    SetOpaqueRegion {
        /// target surface
        surface: SurfaceId,
        /// the region, `None` meaning fully translucent
        region: Option<RegionAttributes>,
    },
    /// Set the buffer scale
    SetBufferScale {
        /// target surface
        surface: SurfaceId,
        /// the scale
        scale: i32,
    },
    /// Set the buffer transform
    SetBufferTransform {
        /// target surface
        surface: SurfaceId,
        /// the transform
        transform: Transform,
    },
    /// Request a frame callback
    Frame {
        /// target surface
        surface: SurfaceId,
        /// client-side id of the callback
        callback: u32,
    },
    /// Commit the pending state of the surface
    Commit {
        /// target surface
        surface: SurfaceId,
    },
    /// Destroy a surface
    DestroySurface {
        /// target surface
        surface: SurfaceId,
    },
    /// Assign a shell role to the surface
    SetRole {
        /// target surface
        surface: SurfaceId,
        /// the role and its parameters
        role: RoleParams,
    },
    /// Set the window geometry, excluding client-side decorations
    SetWindowGeometry {
        /// target surface
        surface: SurfaceId,
        /// the geometry, in surface coordinates
        geometry: Rectangle<i32, Logical>,
    },
    /// Acknowledge a configure
    AckConfigure {
        /// target surface
        surface: SurfaceId,
        /// serial of the configure being acknowledged
        serial: Serial,
    },
    /// Answer to a ping
    Pong {
        /// serial of the ping
        serial: Serial,
    },
    /// Ask to be maximized
    SetMaximized {
        /// target toplevel
        surface: SurfaceId,
    },
    /// Ask to be un-maximized
    UnsetMaximized {
        /// target toplevel
        surface: SurfaceId,
    },
    /// Ask to be made fullscreen
    SetFullscreen {
        /// target toplevel
        surface: SurfaceId,
    },
    /// Ask to leave fullscreen
    UnsetFullscreen {
        /// target toplevel
        surface: SurfaceId,
    },
    /// Ask to be minimized
    SetMinimized {
        /// target toplevel
        surface: SurfaceId,
    },
    /// Take an explicit grab for a popup
    PopupGrab {
        /// target popup
        surface: SurfaceId,
        /// serial of the user event triggering the grab
        serial: Serial,
    },
    /// Start a drag'n'drop operation
    StartDrag {
        /// source of the data, `None` for a client-internal drag
        source: Option<SourceId>,
        /// surface the drag originates from
        origin: SurfaceId,
        /// surface to use as drag icon
        icon: Option<SurfaceId>,
        /// serial of the implicit grab on the origin
        serial: Serial,
    },
    /// Set the selection, `None` clearing it
    SetSelection {
        /// the source
        source: Option<SourceId>,
        /// serial of the event that triggered this request
        serial: Serial,
    },
    /// Ask for the content of an offer in a given mime type
    OfferReceive {
        /// the offer
        offer: OfferId,
        /// the requested mime type
        mime_type: String,
    },
    /// Destroy an offer
    DestroyOffer {
        /// the offer
        offer: OfferId,
    },
    /// Destroy a data source
    DestroySource {
        /// the source
        source: SourceId,
    },
    /// Associate the client with a process
    MapClientToProcess {
        /// process id of the client
        process_id: u32,
    },
    /// Authenticate the client
    AuthenticateWithToken {
        /// the authentication token
        token: String,
    },
    /// Update a window property of a surface
    UpdateWindowProperty {
        /// target surface
        surface: SurfaceId,
        /// name of the property
        name: String,
        /// opaque value of the property
        value: Vec<u8>,
    },
}

/// Events emitted by the compositor
///
/// Events carrying a `client` are addressed to that client, the others are notifications
/// for the compositor itself (rendering, window management).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A toplevel configure, followed by its `xdg_surface.configure`
    ToplevelConfigure {
        /// target client
        client: ClientId,
        /// configured surface
        surface: SurfaceId,
        /// the configure
        configure: ToplevelConfigure,
    },
    /// A popup configure, followed by its `xdg_surface.configure`
    PopupConfigure {
        /// target client
        client: ClientId,
        /// configured surface
        surface: SurfaceId,
        /// the configure
        configure: PopupConfigure,
    },
    /// Liveness check of the client
    Ping {
        /// target client
        client: ClientId,
        /// serial to answer with
        serial: Serial,
    },
    /// The compositor asks the toplevel to close
    Close {
        /// target client
        client: ClientId,
        /// target toplevel
        surface: SurfaceId,
    },
    /// The popup has been dismissed
    PopupDone {
        /// target client
        client: ClientId,
        /// dismissed popup
        surface: SurfaceId,
    },
    /// A toplevel asked to be minimized
    MinimizeRequested {
        /// the toplevel
        surface: SurfaceId,
    },
    /// New content of a surface became current
    Committed {
        /// the surface
        surface: SurfaceId,
    },
    /// A frame callback is done
    FrameDone {
        /// target client
        client: ClientId,
        /// client-side id of the callback
        callback: u32,
        /// timestamp in milliseconds
        time: u32,
    },
    /// Introduction of a new data offer
    DataOffer {
        /// target client
        client: ClientId,
        /// the new offer
        offer: OfferId,
        /// mime types available through the offer
        mime_types: Vec<String>,
    },
    /// The selection changed
    Selection {
        /// target client
        client: ClientId,
        /// offer for the new selection, `None` if there is no selection
        offer: Option<OfferId>,
    },
    /// A drag entered a surface of the client
    DragEnter {
        /// target client
        client: ClientId,
        /// serial of the enter
        serial: Serial,
        /// the entered surface
        surface: SurfaceId,
        /// pointer location, in surface coordinates
        location: Point<f64, Logical>,
        /// offer for the dragged data, `None` for client-internal drags
        offer: Option<OfferId>,
    },
    /// The drag moved over the focused surface
    DragMotion {
        /// target client
        client: ClientId,
        /// timestamp in milliseconds
        time: u32,
        /// pointer location, in surface coordinates
        location: Point<f64, Logical>,
    },
    /// The drag left the surface
    DragLeave {
        /// target client
        client: ClientId,
    },
    /// The drag was dropped on the focused surface
    Drop {
        /// target client
        client: ClientId,
    },
    /// A client asks for the data of a source
    SourceSend {
        /// owner of the source
        client: ClientId,
        /// the source
        source: SourceId,
        /// requested mime type
        mime_type: String,
    },
    /// The source is no longer used
    SourceCancelled {
        /// owner of the source
        client: ClientId,
        /// the source
        source: SourceId,
    },
    /// The drag icon changed
    DragIconChanged {
        /// the new icon surface
        icon: Option<SurfaceId>,
    },
    /// The drag icon moved, in compositor space
    DragIconMoved {
        /// new location of the icon
        position: Point<f64, Logical>,
    },
    /// A client authenticated itself
    ClientAuthenticated {
        /// the client
        client: ClientId,
    },
    /// A client updated a window property
    WindowPropertyChanged {
        /// the client
        client: ClientId,
        /// the surface
        surface: SurfaceId,
        /// property name
        name: String,
        /// property value
        value: Vec<u8>,
    },
    /// The compositor set a window property
    WindowProperty {
        /// target client
        client: ClientId,
        /// the surface
        surface: SurfaceId,
        /// property name
        name: String,
        /// property value
        value: Vec<u8>,
    },
    /// A fatal protocol error, the client connection is terminated afterwards
    ProtocolError {
        /// offending client
        client: ClientId,
        /// the error
        error: ProtocolError,
    },
}

impl Event {
    /// The client this event is addressed to, if any
    pub fn client(&self) -> Option<ClientId> {
        match self {
            Event::ToplevelConfigure { client, .. }
            | Event::PopupConfigure { client, .. }
            | Event::Ping { client, .. }
            | Event::Close { client, .. }
            | Event::PopupDone { client, .. }
            | Event::FrameDone { client, .. }
            | Event::DataOffer { client, .. }
            | Event::Selection { client, .. }
            | Event::DragEnter { client, .. }
            | Event::DragMotion { client, .. }
            | Event::DragLeave { client }
            | Event::Drop { client }
            | Event::SourceSend { client, .. }
            | Event::SourceCancelled { client, .. }
            | Event::WindowProperty { client, .. }
            | Event::ProtocolError { client, .. } => Some(*client),
            Event::MinimizeRequested { .. }
            | Event::Committed { .. }
            | Event::DragIconChanged { .. }
            | Event::DragIconMoved { .. }
            | Event::ClientAuthenticated { .. }
            | Event::WindowPropertyChanged { .. } => None,
        }
    }
}

/// Queue of outgoing events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    /// Queue an event
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Drain all queued events, in emission order
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain(..)
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Fatal protocol violations
///
/// These are reported to the offending client, whose connection is then terminated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The surface already has a different role
    #[error("{surface} already has the {existing} role")]
    RoleAlreadyAssigned {
        /// the surface
        surface: SurfaceId,
        /// its existing role
        existing: Role,
    },
    /// The surface has no shell role
    #[error("{0} has no shell role")]
    NotConstructed(SurfaceId),
    /// The surface is not a toplevel
    #[error("{0} is not a toplevel")]
    NotAToplevel(SurfaceId),
    /// The surface is not a popup
    #[error("{0} is not a popup")]
    NotAPopup(SurfaceId),
    /// The acknowledged serial was never sent, or was superseded by a newer ack
    #[error("serial {serial} is not a pending configure of {surface}")]
    InvalidConfigureSerial {
        /// the surface
        surface: SurfaceId,
        /// the acknowledged serial
        serial: Serial,
    },
    /// The popup parent is not a shell surface
    #[error("invalid popup parent {0}")]
    InvalidPopupParent(SurfaceId),
    /// Unknown surface
    #[error("unknown surface {0}")]
    UnknownSurface(SurfaceId),
    /// Unknown data source
    #[error("unknown data source {0}")]
    UnknownSource(SourceId),
    /// Unknown buffer
    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferHandle),
    /// The object belongs to another client
    #[error("{0} belongs to another client")]
    ForeignObject(String),
    /// The buffer scale is not positive
    #[error("invalid buffer scale {0}")]
    InvalidScale(i32),
}

/// The result of processing a request
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request was processed
    Handled,
    /// The request was stale or racy and has been dropped
    Ignored,
    /// The request is a protocol violation
    ClientFault(ProtocolError),
}

impl Outcome {
    /// Whether the request was processed
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled)
    }
}

impl From<ProtocolError> for Outcome {
    fn from(err: ProtocolError) -> Self {
        Outcome::ClientFault(err)
    }
}

impl From<Result<(), ProtocolError>> for Outcome {
    fn from(result: Result<(), ProtocolError>) -> Self {
        match result {
            Ok(()) => Outcome::Handled,
            Err(err) => Outcome::ClientFault(err),
        }
    }
}
