use tracing::{debug, trace};

use crate::input::pointer::PointerFocus;
use crate::input::PointerFocusProvider;
use crate::utils::{ClientId, IdGenerator, Logical, OfferId, Point, Serial, SerialCounter, SourceId, SurfaceId};
use crate::wayland::protocol::{Event, EventQueue, Outcome};

use super::{DataDeviceState, OfferKind};

/// An active drag'n'drop session
///
/// While it lasts, the pointer is exclusively grabbed: the surfaces under it receive drag
/// events instead of regular pointer events.
#[derive(Debug, Clone, PartialEq)]
pub struct DnDGrab {
    client: ClientId,
    source: Option<SourceId>,
    origin: SurfaceId,
    button: u32,
    serial: Serial,
    pub(crate) icon: Option<SurfaceId>,
    icon_position: Point<f64, Logical>,
    pub(crate) focus: Option<PointerFocus>,
    pub(crate) offer: Option<OfferId>,
}

impl DnDGrab {
    /// The client that started the drag
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// The dragged source, `None` for a client-internal drag
    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// The surface the drag started from
    pub fn origin(&self) -> SurfaceId {
        self.origin
    }

    /// The pointer button whose release ends the drag
    pub fn button(&self) -> u32 {
        self.button
    }

    /// Serial of the implicit grab the drag was started with
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// The drag icon
    pub fn icon(&self) -> Option<SurfaceId> {
        self.icon
    }

    /// Location of the drag icon, in the global compositor space
    pub fn icon_position(&self) -> Point<f64, Logical> {
        self.icon_position
    }

    /// The surface currently entered by the drag
    pub fn focus(&self) -> Option<SurfaceId> {
        self.focus.map(|focus| focus.surface)
    }

    /// Whether drag events may be sent to this client
    ///
    /// Drags without a source stay within the client that started them.
    fn may_enter(&self, client: ClientId) -> bool {
        self.source.is_some() || client == self.client
    }
}

impl DataDeviceState {
    /// Start a drag'n'drop session
    ///
    /// Requests that do not match the current implicit grab of the pointer are ignored: the
    /// serial must be the one of the grab, the button that started the grab must still be
    /// held, and the pointer must be over the origin surface.
    pub(crate) fn start_drag<P: PointerFocusProvider>(
        &mut self,
        client: ClientId,
        source: Option<SourceId>,
        origin: SurfaceId,
        icon: Option<SurfaceId>,
        serial: Serial,
        pointer: &P,
        events: &mut EventQueue,
    ) -> Outcome {
        if let Some(source) = source {
            if let Err(err) = self.client_source(client, source) {
                return Outcome::ClientFault(err);
            }
        }
        if self.drag.is_some() {
            debug!(serial = %serial, "drag already in progress");
            return Outcome::Ignored;
        }
        if pointer.grab_serial() != Some(serial) {
            debug!(serial = %serial, grab = ?pointer.grab_serial(), "start_drag serial does not match the pointer grab");
            return Outcome::Ignored;
        }
        let Some(button) = pointer.grab_button().filter(|button| pointer.is_pressed(*button)) else {
            debug!(serial = %serial, "start_drag after the grab button was released");
            return Outcome::Ignored;
        };
        if pointer.focused_surface() != Some(origin) {
            debug!(origin = %origin, "start_drag from a surface without pointer focus");
            return Outcome::Ignored;
        }

        debug!(client = %client, source = ?source, origin = %origin, "drag started");
        let drag = DnDGrab {
            client,
            source,
            origin,
            button,
            serial,
            icon,
            icon_position: pointer.location(),
            focus: None,
            offer: None,
        };
        events.push(Event::DragIconChanged { icon });
        events.push(Event::DragIconMoved {
            position: drag.icon_position,
        });
        self.drag = Some(drag);
        Outcome::Handled
    }

    /// The pointer moved while dragging
    ///
    /// `target` is the surface under the pointer.
    pub(crate) fn drag_motion(
        &mut self,
        target: Option<PointerFocus>,
        location: Point<f64, Logical>,
        time: u32,
        serials: &SerialCounter,
        ids: &IdGenerator,
        events: &mut EventQueue,
    ) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        drag.icon_position = location;
        if drag.icon.is_some() {
            events.push(Event::DragIconMoved { position: location });
        }

        let current = drag.focus.map(|focus| focus.surface);
        if target.map(|focus| focus.surface) != current {
            self.set_drag_focus(target, location, serials, ids, events);
        } else if let Some(focus) = target.filter(|_| drag.focus.is_some()) {
            // the surface may have moved since it was entered
            drag.focus = Some(focus);
            events.push(Event::DragMotion {
                client: focus.client,
                time,
                location: location - focus.origin,
            });
        }
    }

    /// Move the drag focus, sending leave to the previous surface before entering the new one
    fn set_drag_focus(
        &mut self,
        target: Option<PointerFocus>,
        location: Point<f64, Logical>,
        serials: &SerialCounter,
        ids: &IdGenerator,
        events: &mut EventQueue,
    ) {
        self.drag_leave(events);

        let Some(target) = target else {
            return;
        };
        let Some(drag) = self.drag.as_ref() else {
            return;
        };
        if !drag.may_enter(target.client) || !self.has_data_device(target.client) {
            trace!(surface = %target.surface, "drag cannot enter surface");
            return;
        }
        let source = drag.source;

        let offer = match source {
            Some(source) => match self.create_offer(target.client, source, OfferKind::DragAndDrop, ids, events) {
                Some(offer) => Some(offer),
                None => return,
            },
            None => None,
        };
        let serial = serials.next_serial();
        events.push(Event::DragEnter {
            client: target.client,
            serial,
            surface: target.surface,
            location: location - target.origin,
            offer,
        });
        if let Some(drag) = self.drag.as_mut() {
            drag.focus = Some(target);
            drag.offer = offer;
        }
    }

    /// Leave the surface currently entered by the drag, if any
    fn drag_leave(&mut self, events: &mut EventQueue) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let Some(focus) = drag.focus.take() else {
            return;
        };
        events.push(Event::DragLeave { client: focus.client });
        if let Some(offer) = drag.offer.take() {
            self.deactivate_offers(|o| o.id == offer);
        }
    }

    /// A pointer button was released while dragging
    ///
    /// Releasing the button that started the drag drops on the entered surface, or cancels
    /// the drag if there is none. Returns `true` if the session ended.
    pub(crate) fn drag_button_released(&mut self, button: u32, events: &mut EventQueue) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        if drag.button != button {
            return false;
        }

        match drag.focus {
            Some(focus) => {
                debug!(surface = %focus.surface, "drag dropped");
                events.push(Event::Drop { client: focus.client });
                events.push(Event::DragLeave { client: focus.client });
                drag.focus = None;
                // the dropped offer stays usable until its client destroys it
                drag.offer = None;
            }
            None => {
                debug!("drag released outside of any surface");
                if let Some(source) = drag.source.and_then(|source| self.sources.get(&source)) {
                    events.push(Event::SourceCancelled {
                        client: source.client(),
                        source: source.id(),
                    });
                }
            }
        }
        self.end_drag(events);
        true
    }

    /// Abort the session without dropping
    pub(crate) fn cancel_drag(&mut self, events: &mut EventQueue) {
        self.drag_leave(events);
        self.end_drag(events);
    }

    fn end_drag(&mut self, events: &mut EventQueue) {
        if let Some(drag) = self.drag.take() {
            if drag.icon.is_some() {
                events.push(Event::DragIconChanged { icon: None });
            }
        }
    }
}
