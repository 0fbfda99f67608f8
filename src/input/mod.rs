//! Input abstractions
//!
//! This module provides a minimal model of a wayland seat: the pointer location, focus,
//! pressed buttons and grab, and the keyboard focus. Input itself is fed by the
//! compositor through [`CompositorState::pointer_motion`](crate::wayland::CompositorState::pointer_motion),
//! [`CompositorState::pointer_button`](crate::wayland::CompositorState::pointer_button) and
//! [`CompositorState::set_keyboard_focus`](crate::wayland::CompositorState::set_keyboard_focus).
//!
//! The data device only observes the seat through the [`PointerFocusProvider`] and
//! [`KeyboardFocusProvider`] traits.

use crate::utils::{ClientId, Logical, Point, Serial, SurfaceId};

pub mod keyboard;
pub mod pointer;

use self::keyboard::KeyboardState;
use self::pointer::PointerState;

/// Read access to the pointer state of a seat
pub trait PointerFocusProvider {
    /// The surface currently focused by the pointer
    fn focused_surface(&self) -> Option<SurfaceId>;
    /// Whether any button is held down
    fn is_button_pressed(&self) -> bool;
    /// Whether the given button is held down
    fn is_pressed(&self, button: u32) -> bool;
    /// Serial of the button press that started the current implicit grab
    fn grab_serial(&self) -> Option<Serial>;
    /// The button that started the current grab
    fn grab_button(&self) -> Option<u32>;
    /// Location of the pointer, in the global compositor space
    fn location(&self) -> Point<f64, Logical>;
}

/// Read access to the keyboard state of a seat
pub trait KeyboardFocusProvider {
    /// The client owning the keyboard focus
    fn focused_client(&self) -> Option<ClientId>;
}

/// A seat, grouping a pointer and a keyboard
#[derive(Debug)]
pub struct Seat {
    name: String,
    pointer: PointerState,
    keyboard: KeyboardState,
}

impl Seat {
    /// Create a new seat
    pub fn new(name: impl Into<String>) -> Self {
        Seat {
            name: name.into(),
            pointer: PointerState::default(),
            keyboard: KeyboardState::default(),
        }
    }

    /// Name of this seat
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access the pointer of this seat
    pub fn get_pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Access the keyboard of this seat
    pub fn get_keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub(crate) fn pointer_mut(&mut self) -> &mut PointerState {
        &mut self.pointer
    }

    pub(crate) fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }
}
