//! Client buffer integrations
//!
//! A client buffer integration resolves the opaque [`BufferHandle`]s attached to surfaces
//! into the little metadata the protocol core needs: the buffer dimensions and the
//! orientation of its content.
//!
//! Two variants are provided:
//!
//! - [`ShmIntegration`] for shared-memory buffers, described by their pool layout
//! - [`HardwareIntegration`] for buffers allocated by the graphics stack
//!
//! Compositors may provide their own by implementing [`ClientBufferIntegration`].

use std::collections::HashMap;

use thiserror::Error;
use tracing::trace;

use crate::utils::{Buffer, BufferHandle, Size};

/// Pixel formats accepted for shared-memory buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmFormat {
    /// 32-bit ARGB format
    Argb8888,
    /// 32-bit RGB format, alpha ignored
    Xrgb8888,
}

impl ShmFormat {
    fn bytes_per_pixel(self) -> i32 {
        4
    }
}

/// Description of a buffer, as provided by the client when creating it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferDescriptor {
    /// A buffer carved out of a shared-memory pool
    Shm {
        /// Offset of the start of the buffer relative to the beginning of the pool in bytes
        offset: i32,
        /// Width of the buffer in pixels
        width: i32,
        /// Height of the buffer in pixels
        height: i32,
        /// Stride of the buffer in bytes
        stride: i32,
        /// Format used by this buffer
        format: ShmFormat,
    },
    /// A buffer allocated by the graphics stack of the client
    Native {
        /// Width of the buffer in pixels
        width: i32,
        /// Height of the buffer in pixels
        height: i32,
        /// Opaque format modifier
        modifier: u64,
    },
}

/// Origin of the content of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The first row of the buffer is the top of the image
    TopLeft,
    /// The first row of the buffer is the bottom of the image
    BottomLeft,
}

/// Errors that can occur when importing or resolving a buffer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// The descriptor is not supported by the active integration
    #[error("buffer descriptor is not supported by the {0} integration")]
    Unsupported(&'static str),
    /// The descriptor is malformed
    #[error("invalid buffer layout: {0}")]
    InvalidLayout(&'static str),
    /// The buffer handle is not known to the integration
    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferHandle),
    /// The client importing the buffer is no longer connected
    #[error("the client is no longer connected")]
    DeadClient,
}

/// Capability interface to the buffer backing of client surfaces
pub trait ClientBufferIntegration: std::fmt::Debug {
    /// Name of this integration, for logging purposes
    fn name(&self) -> &'static str;

    /// Import a buffer described by the client under the given handle
    fn import(&mut self, handle: BufferHandle, descriptor: BufferDescriptor) -> Result<(), BufferError>;

    /// Forget about a buffer
    fn release(&mut self, handle: BufferHandle);

    /// Retrieve the dimensions of a buffer
    fn buffer_size(&self, handle: BufferHandle) -> Option<Size<i32, Buffer>>;

    /// The origin of the buffer content
    fn origin(&self, handle: BufferHandle) -> Origin {
        let _ = handle;
        Origin::TopLeft
    }
}

/// Metadata of an imported shared-memory buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmBufferData {
    /// Offset of the start of the buffer relative to the beginning of the pool in bytes
    pub offset: i32,
    /// Width of the buffer in pixels
    pub width: i32,
    /// Height of the buffer in pixels
    pub height: i32,
    /// Stride of the buffer in bytes
    pub stride: i32,
    /// Format used by this buffer
    pub format: ShmFormat,
}

/// Shared-memory buffer integration
#[derive(Debug, Default)]
pub struct ShmIntegration {
    buffers: HashMap<BufferHandle, ShmBufferData>,
}

impl ShmIntegration {
    /// Create a new, empty, shm integration
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the metadata of an imported buffer
    pub fn buffer_data(&self, handle: BufferHandle) -> Option<&ShmBufferData> {
        self.buffers.get(&handle)
    }
}

impl ClientBufferIntegration for ShmIntegration {
    fn name(&self) -> &'static str {
        "shm"
    }

    fn import(&mut self, handle: BufferHandle, descriptor: BufferDescriptor) -> Result<(), BufferError> {
        let BufferDescriptor::Shm {
            offset,
            width,
            height,
            stride,
            format,
        } = descriptor
        else {
            return Err(BufferError::Unsupported(self.name()));
        };

        if offset < 0 || width <= 0 || height <= 0 {
            return Err(BufferError::InvalidLayout("negative offset or empty size"));
        }
        let min_stride = width
            .checked_mul(format.bytes_per_pixel())
            .ok_or(BufferError::InvalidLayout("width too large"))?;
        if stride < min_stride {
            return Err(BufferError::InvalidLayout("stride too small for width"));
        }

        trace!(buffer = %handle, width, height, stride, "shm buffer imported");
        self.buffers.insert(
            handle,
            ShmBufferData {
                offset,
                width,
                height,
                stride,
                format,
            },
        );
        Ok(())
    }

    fn release(&mut self, handle: BufferHandle) {
        self.buffers.remove(&handle);
    }

    fn buffer_size(&self, handle: BufferHandle) -> Option<Size<i32, Buffer>> {
        self.buffers
            .get(&handle)
            .map(|data| (data.width, data.height).into())
    }
}

/// Hardware-accelerated buffer integration
///
/// Native buffers are rendered by the graphics stack with a bottom-left origin.
#[derive(Debug, Default)]
pub struct HardwareIntegration {
    buffers: HashMap<BufferHandle, (Size<i32, Buffer>, u64)>,
}

impl HardwareIntegration {
    /// Create a new, empty, hardware integration
    pub fn new() -> Self {
        Self::default()
    }

    /// The format modifier of an imported buffer
    pub fn modifier(&self, handle: BufferHandle) -> Option<u64> {
        self.buffers.get(&handle).map(|(_, modifier)| *modifier)
    }
}

impl ClientBufferIntegration for HardwareIntegration {
    fn name(&self) -> &'static str {
        "hardware"
    }

    fn import(&mut self, handle: BufferHandle, descriptor: BufferDescriptor) -> Result<(), BufferError> {
        let BufferDescriptor::Native {
            width,
            height,
            modifier,
        } = descriptor
        else {
            return Err(BufferError::Unsupported(self.name()));
        };

        if width <= 0 || height <= 0 {
            return Err(BufferError::InvalidLayout("empty size"));
        }

        trace!(buffer = %handle, width, height, modifier, "native buffer imported");
        self.buffers.insert(handle, ((width, height).into(), modifier));
        Ok(())
    }

    fn release(&mut self, handle: BufferHandle) {
        self.buffers.remove(&handle);
    }

    fn buffer_size(&self, handle: BufferHandle) -> Option<Size<i32, Buffer>> {
        self.buffers.get(&handle).map(|(size, _)| *size)
    }

    fn origin(&self, _handle: BufferHandle) -> Origin {
        Origin::BottomLeft
    }
}
