#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # Waysync: surface configuration and data transfer state machines
//!
//! This crate implements the protocol logic a wayland compositor needs to negotiate the
//! state of client windows and to move data between clients. It does not do any I/O: a
//! transport layer decodes client requests, hands them over as typed messages, and
//! delivers the events the state machines emit in response.
//!
//! ## Structure of the crate
//!
//! - [`wayland`] contains the compositor side: surfaces and their double-buffered state,
//!   the configure/ack handshake of `xdg_shell` windows, the clipboard and drag'n'drop
//!   of the data device, and the registry of connected clients. Everything is owned by a
//!   single [`CompositorState`](wayland::CompositorState).
//! - [`client`] contains the client side of the window state negotiation: how a window
//!   reconciles the configures it receives with its own windowed geometry.
//! - [`input`] contains the small seat model the data device depends on: pointer focus,
//!   button grabs and keyboard focus.
//! - [`backend`] contains the buffer capability interface, and its shared-memory and
//!   hardware-accelerated variants.
//! - [`dispatch`] integrates the state with a [`calloop`] event loop.
//! - [`utils`] contains serials, geometry types and object handles.
//!
//! ## The event loop and state handling
//!
//! All requests are processed sequentially by the single `CompositorState`, in the order
//! they were received. Connection threads send their decoded requests through the channel
//! created by [`dispatch::insert_dispatcher`]; [`calloop`] then invokes the state with a
//! mutable reference, without any synchronization.
//!
//! ### Logging
//!
//! Waysync makes extensive use of [`tracing`] for its internal logging.
//!
//! For release builds it is recommended to limit the log level during compile time.
//! This can be done by adding a dependency to [`tracing`] and enabling the corresponding features.
//! For example to enable `trace` messages for debug builds, but limit release builds to `debug` add
//! the following in your binary crate `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tracing = { version = "0.1", features = ["max_level_trace", "release_max_level_debug"] }
//! ```

pub mod backend;
pub mod client;
pub mod dispatch;
pub mod input;
pub mod utils;
pub mod wayland;
