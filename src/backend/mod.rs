//! Backend capability interfaces
//!
//! The protocol core never looks at pixels. Everything it needs to know about the
//! content a client attaches to a surface goes through the capability traits defined
//! here, and the concrete variant is picked once, when the
//! [`CompositorState`](crate::wayland::CompositorState) is created.

pub mod buffer;
