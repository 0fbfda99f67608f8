use tracing::{debug, trace};

use crate::utils::{Logical, Serial, Size, SurfaceId};
use crate::wayland::protocol::{Event, Request};
use crate::wayland::shell::xdg::{ToplevelState, ToplevelStates};

/// How a window is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowState {
    /// A regular window
    Windowed,
    /// The window fills the output, decorations excluded
    Maximized,
    /// The window covers the whole output
    Fullscreen,
}

/// Changes a [`Window`] went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window was exposed for the first time
    Exposed,
    /// The window size changed
    Resized(Size<i32, Logical>),
    /// The window states changed
    StateChanged {
        /// the states before the change
        old: ToplevelStates,
        /// the new states
        new: ToplevelStates,
    },
    /// The window gained or lost activation
    ActivationChanged(bool),
    /// The compositor asked the window to close
    CloseRequested,
}

/// Client-side state of a toplevel window
#[derive(Debug)]
pub struct Window {
    surface: SurfaceId,
    windowed_geometry: Size<i32, Logical>,
    size: Size<i32, Logical>,
    states: ToplevelStates,
    exposed: bool,
    pending: Option<ToplevelState>,
    requests: Vec<Request>,
    events: Vec<WindowEvent>,
}

impl Window {
    /// Create a window for a toplevel surface, with the size it would like to have
    pub fn new(surface: SurfaceId, size: impl Into<Size<i32, Logical>>) -> Self {
        let size = size.into();
        Window {
            surface,
            windowed_geometry: size,
            size,
            states: ToplevelStates::empty(),
            exposed: false,
            pending: None,
            requests: Vec::new(),
            events: Vec::new(),
        }
    }

    /// The surface of this window
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// The current size of the window
    pub fn size(&self) -> Size<i32, Logical> {
        self.size
    }

    /// The size the window returns to when it is neither maximized nor fullscreen
    pub fn windowed_geometry(&self) -> Size<i32, Logical> {
        self.windowed_geometry
    }

    /// The current states of the window
    pub fn states(&self) -> ToplevelStates {
        self.states
    }

    /// How the window is shown
    ///
    /// A window that is both maximized and fullscreen is shown fullscreen.
    pub fn window_state(&self) -> WindowState {
        if self.states.contains(ToplevelStates::FULLSCREEN) {
            WindowState::Fullscreen
        } else if self.states.contains(ToplevelStates::MAXIMIZED) {
            WindowState::Maximized
        } else {
            WindowState::Windowed
        }
    }

    /// Whether the window is activated
    pub fn is_active(&self) -> bool {
        self.states.contains(ToplevelStates::ACTIVATED)
    }

    /// Whether the window was exposed
    ///
    /// A window is exposed once it acknowledged its first configure, and stays so.
    pub fn is_exposed(&self) -> bool {
        self.exposed
    }

    /// Process an event of the compositor
    ///
    /// Events that are not addressed to this window are ignored. Returns whether the event
    /// was consumed.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        match event {
            Event::ToplevelConfigure {
                surface, configure, ..
            } if *surface == self.surface => {
                self.handle_toplevel_configure(configure.state.size, configure.state.states);
                self.handle_surface_configure(configure.serial);
                true
            }
            Event::Close { surface, .. } if *surface == self.surface => {
                self.events.push(WindowEvent::CloseRequested);
                true
            }
            _ => false,
        }
    }

    /// A toplevel configure was received
    ///
    /// It only takes effect with the surface configure that follows it.
    pub fn handle_toplevel_configure(&mut self, size: Size<i32, Logical>, states: ToplevelStates) {
        trace!(surface = %self.surface, ?size, ?states, "toplevel configure");
        self.pending = Some(ToplevelState { size, states });
    }

    /// A surface configure was received
    ///
    /// The configure is acknowledged, and the toplevel configure received before it is
    /// applied.
    pub fn handle_surface_configure(&mut self, serial: Serial) {
        self.requests.push(Request::AckConfigure {
            surface: self.surface,
            serial,
        });
        if let Some(state) = self.pending.take() {
            self.reconcile(state);
        }
        if !self.exposed {
            debug!(surface = %self.surface, "window exposed");
            self.exposed = true;
            self.events.push(WindowEvent::Exposed);
        }
    }

    fn reconcile(&mut self, configure: ToplevelState) {
        let new_states = configure.states;
        let size = if new_states.is_constrained() {
            pick_size(configure.size, self.size)
        } else {
            pick_size(configure.size, self.windowed_geometry)
        };
        if !new_states.intersects(ToplevelStates::MAXIMIZED | ToplevelStates::FULLSCREEN | ToplevelStates::RESIZING) {
            self.windowed_geometry = size;
        }

        if size != self.size {
            self.size = size;
            self.events.push(WindowEvent::Resized(size));
        }

        let old_states = self.states;
        if old_states != new_states {
            self.states = new_states;
            self.events.push(WindowEvent::StateChanged {
                old: old_states,
                new: new_states,
            });
            let active = new_states.contains(ToplevelStates::ACTIVATED);
            if active != old_states.contains(ToplevelStates::ACTIVATED) {
                self.events.push(WindowEvent::ActivationChanged(active));
            }
        }
    }

    /// Resize the window on the initiative of the client
    ///
    /// Ignored while the window is maximized or fullscreen.
    pub fn resize(&mut self, size: Size<i32, Logical>) {
        if self.states.is_constrained() || size == self.size {
            return;
        }
        self.size = size;
        self.windowed_geometry = size;
        self.events.push(WindowEvent::Resized(size));
    }

    /// Ask the compositor to maximize the window
    pub fn request_maximize(&mut self) {
        self.requests.push(Request::SetMaximized { surface: self.surface });
    }

    /// Ask the compositor to un-maximize the window
    pub fn request_unmaximize(&mut self) {
        self.requests.push(Request::UnsetMaximized { surface: self.surface });
    }

    /// Ask the compositor to make the window fullscreen
    pub fn request_fullscreen(&mut self) {
        self.requests.push(Request::SetFullscreen { surface: self.surface });
    }

    /// Ask the compositor to leave fullscreen
    pub fn request_unfullscreen(&mut self) {
        self.requests.push(Request::UnsetFullscreen { surface: self.surface });
    }

    /// Ask the compositor to minimize the window
    ///
    /// The compositor never tells whether the window was actually minimized.
    pub fn request_minimize(&mut self) {
        self.requests.push(Request::SetMinimized { surface: self.surface });
    }

    /// Take the requests the window wants to send, in order
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    /// Take the changes the window went through, in order
    pub fn take_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Dimensions the compositor left to zero are picked by the client
fn pick_size(proposed: Size<i32, Logical>, fallback: Size<i32, Logical>) -> Size<i32, Logical> {
    let w = if proposed.w > 0 { proposed.w } else { fallback.w };
    let h = if proposed.h > 0 { proposed.h } else { fallback.h };
    (w, h).into()
}
