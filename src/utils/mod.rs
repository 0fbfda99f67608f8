//! Various utilities functions and types

mod geometry;
pub mod ids;
mod serial;

pub use self::geometry::{Buffer, Coordinate, Logical, Point, Rectangle, Size};
pub use self::ids::{BufferHandle, ClientId, IdGenerator, OfferId, SourceId, SurfaceId};
pub use self::serial::{Serial, SerialCounter};

/// Trait that is implemented on protocol objects whose lifetime is tracked
pub trait IsAlive {
    /// Check if object is alive
    fn alive(&self) -> bool;
}

impl<T: IsAlive> IsAlive for &T {
    #[inline]
    fn alive(&self) -> bool {
        IsAlive::alive(*self)
    }
}

/// This resource has been destroyed and can no longer be used.
#[derive(Debug)]
pub struct DeadResource;

impl std::fmt::Display for DeadResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("This resource has been destroyed and can no longer be used.")
    }
}

impl std::error::Error for DeadResource {}
