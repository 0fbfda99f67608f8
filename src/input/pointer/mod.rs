//! Pointer-related types for seats

use smallvec::SmallVec;
use tracing::trace;

use crate::utils::{ClientId, Logical, Point, Serial, SurfaceId};

use super::PointerFocusProvider;

mod grab;

pub use grab::{GrabStartData, GrabStatus};

/// Describes the physical state of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// The button is released
    Released,
    /// The button is pressed
    Pressed,
}

/// Pointer button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Serial of the event
    pub serial: Serial,
    /// Timestamp with millisecond granularity, with an undefined base.
    pub time: u32,
    /// Button that produced the event
    ///
    /// The button is a button code as defined in the
    /// Linux kernel's linux/input-event-codes.h header file, e.g. BTN_LEFT.
    pub button: u32,
    /// Physical state of the button
    pub state: ButtonState,
}

/// The surface under the pointer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerFocus {
    /// the surface
    pub surface: SurfaceId,
    /// the client owning the surface
    pub client: ClientId,
    /// location of the surface origin in the global compositor space
    pub origin: Point<f64, Logical>,
}

/// State of the pointer of a seat
#[derive(Debug, Default)]
pub struct PointerState {
    location: Point<f64, Logical>,
    focus: Option<PointerFocus>,
    pressed_buttons: SmallVec<[u32; 4]>,
    grab: GrabStatus,
}

impl PointerState {
    /// Location of the pointer, in the global compositor space
    pub fn current_location(&self) -> Point<f64, Logical> {
        self.location
    }

    /// The current focus of the pointer
    pub fn current_focus(&self) -> Option<PointerFocus> {
        self.focus
    }

    /// Location of the pointer relative to the focused surface
    pub fn local_location(&self) -> Option<Point<f64, Logical>> {
        self.focus.map(|focus| self.location - focus.origin)
    }

    /// The buttons currently pressed
    pub fn pressed_buttons(&self) -> &[u32] {
        &self.pressed_buttons
    }

    /// The current grab of the pointer
    pub fn grab(&self) -> &GrabStatus {
        &self.grab
    }

    /// Check if this pointer is currently grabbed with this serial
    pub fn has_grab(&self, serial: Serial) -> bool {
        self.grab.start_data().map(|data| data.serial == serial).unwrap_or(false)
    }

    /// Notify that the pointer moved
    ///
    /// `focus` is the surface under the pointer. It only becomes the pointer focus when no
    /// grab is active.
    pub(crate) fn motion(&mut self, location: Point<f64, Logical>, focus: Option<PointerFocus>) {
        self.location = location;
        if matches!(self.grab, GrabStatus::None) {
            self.focus = focus;
        }
    }

    /// Notify that a button changed state
    pub(crate) fn button(&mut self, event: &ButtonEvent) {
        match event.state {
            ButtonState::Pressed => {
                if !self.pressed_buttons.contains(&event.button) {
                    self.pressed_buttons.push(event.button);
                }
                if matches!(self.grab, GrabStatus::None) {
                    trace!(serial = %event.serial, button = event.button, "implicit grab started");
                    self.grab = GrabStatus::Implicit(GrabStartData {
                        focus: self.focus,
                        button: event.button,
                        serial: event.serial,
                        location: self.location,
                    });
                }
            }
            ButtonState::Released => {
                self.pressed_buttons.retain(|b| *b != event.button);
                if self.pressed_buttons.is_empty() && matches!(self.grab, GrabStatus::Implicit(_)) {
                    self.grab = GrabStatus::None;
                }
            }
        }
    }

    /// Turn the current implicit grab into a drag'n'drop grab
    pub(crate) fn start_dnd_grab(&mut self) {
        if let GrabStatus::Implicit(data) = self.grab {
            self.grab = GrabStatus::DnD(data);
        }
    }

    /// End the drag'n'drop grab
    pub(crate) fn end_dnd_grab(&mut self) {
        if matches!(self.grab, GrabStatus::DnD(_)) {
            self.grab = match self.grab.start_data() {
                Some(data) if !self.pressed_buttons.is_empty() => GrabStatus::Implicit(*data),
                _ => GrabStatus::None,
            };
        }
    }

    pub(crate) fn surface_destroyed(&mut self, surface: SurfaceId) {
        if self.focus.map(|focus| focus.surface == surface).unwrap_or(false) {
            self.focus = None;
        }
    }

    pub(crate) fn client_disconnected(&mut self, client: ClientId) {
        if self.focus.map(|focus| focus.client == client).unwrap_or(false) {
            self.focus = None;
        }
    }
}

impl PointerFocusProvider for PointerState {
    fn focused_surface(&self) -> Option<SurfaceId> {
        self.focus.map(|focus| focus.surface)
    }

    fn is_button_pressed(&self) -> bool {
        !self.pressed_buttons.is_empty()
    }

    fn is_pressed(&self, button: u32) -> bool {
        self.pressed_buttons.contains(&button)
    }

    fn grab_serial(&self) -> Option<Serial> {
        match &self.grab {
            GrabStatus::Implicit(data) => Some(data.serial),
            _ => None,
        }
    }

    fn grab_button(&self) -> Option<u32> {
        self.grab.start_data().map(|data| data.button)
    }

    fn location(&self) -> Point<f64, Logical> {
        self.location
    }
}
