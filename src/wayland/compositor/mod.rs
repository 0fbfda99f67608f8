//! Utilities for handling surfaces and regions
//!
//! This module stores, in a coherent way, the double-buffered state of every surface
//! created by clients. Requests like [`Attach`](crate::wayland::Request::Attach) or
//! [`Damage`](crate::wayland::Request::Damage) write into the *pending* state of the
//! surface; a [`Commit`](crate::wayland::Request::Commit) atomically turns it into the
//! *current* state, which is what the compositor renders.
//!
//! ## Commit gating
//!
//! Surfaces with a shell role must not present anything before their first configure was
//! acknowledged. Commits received before that are not dropped: they are parked in the
//! [`MultiCache`] of the surface under a commit id, and applied in order as soon as the
//! acknowledgement arrives.
//!
//! ## Extending the surface state
//!
//! Any type implementing [`Cacheable`] can be stored alongside the core
//! [`SurfaceAttributes`] in the [`MultiCache`] of a surface, and will follow the same
//! commit semantics. The xdg shell uses this for the window geometry.

pub mod cache;
pub mod roles;

use tracing::trace;

use crate::backend::buffer::ClientBufferIntegration;
use crate::utils::{BufferHandle, ClientId, Logical, Point, Rectangle, Serial, SerialCounter, Size, SurfaceId};

pub use self::cache::{Cacheable, MultiCache};
use self::roles::{AlreadyHasRole, Role};

/// Description of a buffer attach request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAssignment {
    /// The surface no longer has a buffer attached to it
    Removed,
    /// A new buffer was attached
    NewBuffer {
        /// the buffer
        buffer: BufferHandle,
        /// location of the new buffer relative to the previous one
        offset: Point<i32, Logical>,
    },
}

/// Transform under which the buffer contents are to be interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transform {
    /// No transform
    #[default]
    Normal,
    /// 90 degrees counter-clockwise
    _90,
    /// 180 degrees counter-clockwise
    _180,
    /// 270 degrees counter-clockwise
    _270,
    /// 180 degrees around a vertical axis
    Flipped,
    /// Flipped and rotated 90 degrees counter-clockwise
    Flipped90,
    /// Flipped and rotated 180 degrees counter-clockwise
    Flipped180,
    /// Flipped and rotated 270 degrees counter-clockwise
    Flipped270,
}

impl Transform {
    /// Transformed size after applying this transformation
    pub fn transform_size<N: crate::utils::Coordinate, Kind>(&self, size: Size<N, Kind>) -> Size<N, Kind> {
        match self {
            Transform::_90 | Transform::_270 | Transform::Flipped90 | Transform::Flipped270 => {
                (size.h, size.w).into()
            }
            _ => size,
        }
    }
}

/// Kind of a rectangle part of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectangleKind {
    /// This rectangle should be added to the region
    Add,
    /// The intersection of this rectangle with the region should
    /// be removed from the region
    Subtract,
}

/// Description of the contents of a region
///
/// A region is defined as an union and difference of rectangle.
///
/// This struct contains an ordered `Vec` containing the rectangles defining
/// a region. They should be added or subtracted in this order to compute the
/// actual contents of the region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionAttributes {
    /// List of rectangle part of this region
    pub rects: Vec<(RectangleKind, Rectangle<i32, Logical>)>,
}

impl RegionAttributes {
    /// Checks whether given point is inside the region.
    pub fn contains<P: Into<Point<i32, Logical>>>(&self, point: P) -> bool {
        let point: Point<i32, Logical> = point.into();
        let mut contains = false;
        for (kind, rect) in &self.rects {
            if rect.contains(point) {
                match kind {
                    RectangleKind::Add => contains = true,
                    RectangleKind::Subtract => contains = false,
                }
            }
        }
        contains
    }
}

/// General state associated with a surface
///
/// This is double-buffered: requests update the pending instance, and commits merge it
/// into the current one.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAttributes {
    /// Buffer defining the contents of the surface
    ///
    /// `None` means no attach request was issued since the last commit. In the current
    /// state, this holds the last assignment that was committed.
    pub buffer: Option<BufferAssignment>,
    /// Scale of the contents of the buffer, for higher-resolution contents.
    pub buffer_scale: i32,
    /// Transform under which interpret the contents of the buffer
    pub buffer_transform: Transform,
    /// Region of the surface that is guaranteed to be opaque
    ///
    /// By default the whole surface is potentially transparent
    pub opaque_region: Option<RegionAttributes>,
    /// Region of the surface that is sensitive to user input
    ///
    /// By default the whole surface should be sensitive
    pub input_region: Option<RegionAttributes>,
    /// Damage rectangles, in surface coordinates
    ///
    /// In the current state, this accumulates until the compositor consumes it with
    /// [`SurfaceData::take_damage`].
    pub damage: Vec<Rectangle<i32, Logical>>,
    /// Frame callbacks requested by the client
    pub frame_callbacks: Vec<u32>,
}

impl Default for SurfaceAttributes {
    fn default() -> SurfaceAttributes {
        SurfaceAttributes {
            buffer: None,
            buffer_scale: 1,
            buffer_transform: Transform::Normal,
            opaque_region: None,
            input_region: None,
            damage: Vec::new(),
            frame_callbacks: Vec::new(),
        }
    }
}

impl Cacheable for SurfaceAttributes {
    fn commit(&mut self) -> Self {
        SurfaceAttributes {
            buffer: self.buffer.take(),
            buffer_scale: self.buffer_scale,
            buffer_transform: self.buffer_transform,
            opaque_region: self.opaque_region.clone(),
            input_region: self.input_region.clone(),
            damage: std::mem::take(&mut self.damage),
            frame_callbacks: std::mem::take(&mut self.frame_callbacks),
        }
    }

    fn merge_into(self, into: &mut Self) {
        if self.buffer.is_some() {
            into.buffer = self.buffer;
        }
        into.buffer_scale = self.buffer_scale;
        into.buffer_transform = self.buffer_transform;
        into.opaque_region = self.opaque_region;
        into.input_region = self.input_region;
        into.damage.extend(self.damage);
        into.frame_callbacks.extend(self.frame_callbacks);
    }
}

/// Lifecycle of a surface within a commit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No configure was acknowledged yet
    Unconfigured,
    /// A configure was acknowledged, its content was not committed yet
    Configured,
    /// The last commit has been applied
    Committed,
}

/// What happened to a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The committed state is now current
    Applied,
    /// The committed state waits for a configure to be acknowledged
    Blocked,
}

/// A surface and its double-buffered state
#[derive(Debug)]
pub struct SurfaceData {
    id: SurfaceId,
    client: ClientId,
    role: Option<Role>,
    state: SurfaceState,
    cached_state: MultiCache,
    commit_ids: SerialCounter,
    blocked_commit: Option<Serial>,
}

impl SurfaceData {
    pub(crate) fn new(id: SurfaceId, client: ClientId) -> Self {
        SurfaceData {
            id,
            client,
            role: None,
            state: SurfaceState::Unconfigured,
            cached_state: MultiCache::new(),
            commit_ids: SerialCounter::default(),
            blocked_commit: None,
        }
    }

    /// Id of this surface
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// The client owning this surface
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// The role of this surface, if any
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Where this surface stands in its commit cycle
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Access the double-buffered state of this surface
    pub fn cached_state(&self) -> &MultiCache {
        &self.cached_state
    }

    /// Whether a commit waits for a configure to be acknowledged
    pub fn has_blocked_commit(&self) -> bool {
        self.blocked_commit.is_some()
    }

    /// The buffer currently attached to this surface
    pub fn current_buffer(&self) -> Option<BufferHandle> {
        match self.cached_state.current::<SurfaceAttributes>().buffer {
            Some(BufferAssignment::NewBuffer { buffer, .. }) => Some(buffer),
            _ => None,
        }
    }

    /// Whether the current state has a buffer attached
    pub fn is_mapped(&self) -> bool {
        self.current_buffer().is_some()
    }

    /// Size of the surface, as resolved from its current buffer, scale and transform
    pub fn surface_size(&self, buffers: &dyn ClientBufferIntegration) -> Option<Size<i32, Logical>> {
        let attributes = self.cached_state.current::<SurfaceAttributes>();
        let Some(BufferAssignment::NewBuffer { buffer, .. }) = attributes.buffer else {
            return None;
        };
        buffers.buffer_size(buffer).map(|size| {
            let logical = size.to_logical(attributes.buffer_scale);
            attributes.buffer_transform.transform_size(logical)
        })
    }

    /// Take the damage accumulated in the current state
    pub fn take_damage(&mut self) -> Vec<Rectangle<i32, Logical>> {
        std::mem::take(&mut self.cached_state.current::<SurfaceAttributes>().damage)
    }

    pub(crate) fn take_frame_callbacks(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.cached_state.current::<SurfaceAttributes>().frame_callbacks)
    }

    pub(crate) fn give_role(&mut self, role: Role) -> Result<bool, AlreadyHasRole> {
        roles::give_role(&mut self.role, role)
    }

    pub(crate) fn mark_configured(&mut self) {
        self.state = SurfaceState::Configured;
    }

    /// Commit the pending state
    ///
    /// With `gate_open`, the pending state (and everything parked before it) becomes current
    /// immediately. Otherwise it is parked until [`SurfaceData::unblock`] is invoked.
    #[profiling::function]
    pub(crate) fn commit(&mut self, gate_open: bool) -> CommitOutcome {
        if gate_open {
            self.cached_state.commit(None);
            self.blocked_commit = None;
            self.state = SurfaceState::Committed;
            CommitOutcome::Applied
        } else {
            let id = self.commit_ids.next_serial();
            self.cached_state.commit(Some(id));
            self.blocked_commit = Some(id);
            trace!(surface = %self.id, commit = %id, "commit blocked until configured");
            CommitOutcome::Blocked
        }
    }

    /// Apply the parked commits, returns `false` if there was none
    pub(crate) fn unblock(&mut self) -> bool {
        match self.blocked_commit.take() {
            Some(id) => {
                self.cached_state.apply_state(id);
                self.state = SurfaceState::Committed;
                true
            }
            None => false,
        }
    }
}
