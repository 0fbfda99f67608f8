//! Non-owning handles to protocol objects
//!
//! Objects created by clients (surfaces, data sources, ...) live in tables owned by the
//! [`CompositorState`](crate::wayland::CompositorState). Everything else only refers to
//! them through the small copyable ids defined here. An id is never handed out twice by
//! the same [`IdGenerator`], so a handle to a destroyed object can never alias a newer one:
//! lookups through it simply fail.

use std::{cell::Cell, fmt};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// The raw protocol-level value of this id
            pub fn raw(&self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                $name(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "@{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Handle to a connected client
    ClientId,
    "client"
);
id_type!(
    /// Handle to a surface
    SurfaceId,
    "wl_surface"
);
id_type!(
    /// Handle to a data source offered by a client
    SourceId,
    "wl_data_source"
);
id_type!(
    /// Handle to a data offer created for a destination client
    OfferId,
    "wl_data_offer"
);
id_type!(
    /// Opaque handle to a buffer imported through a
    /// [`ClientBufferIntegration`](crate::backend::buffer::ClientBufferIntegration)
    BufferHandle,
    "wl_buffer"
);

/// Generator of unique object ids
///
/// Ids start at 1 and are never reused by the same generator.
#[derive(Debug)]
pub struct IdGenerator {
    counter: Cell<u32>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator { counter: Cell::new(1) }
    }
}

impl IdGenerator {
    /// Produce the next id
    pub fn next<T: From<u32>>(&self) -> T {
        let id = self.counter.get();
        self.counter.set(id.checked_add(1).unwrap_or(1));
        T::from(id)
    }
}
