//! Client side of the window state negotiation
//!
//! The compositor proposes sizes and states with configures, the client decides what it
//! actually displays. A [`Window`] consumes the configure events of its toplevel, answers
//! them with the matching acks, and keeps track of the size it should return to once it
//! is no longer maximized or fullscreen.
//!
//! The window never talks to the compositor directly: the requests it wants to send are
//! queued and retrieved with [`Window::take_requests`], and the changes it went through
//! are reported as [`WindowEvent`]s.

mod window;

pub use self::window::{Window, WindowEvent, WindowState};
