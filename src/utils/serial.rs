use std::{cell::Cell, fmt};

/// A serial type, whose comparison takes into account the wrapping-around behavior of the
/// underlying counter.
///
/// Serials are the correlation tokens the compositor attaches to every event that needs to
/// be acknowledged (configures, pings, pointer button presses used as grab tokens).
#[derive(Debug, Copy, Clone, Hash)]
pub struct Serial(pub(crate) u32);

impl PartialEq for Serial {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Serial {}

impl PartialOrd for Serial {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        let distance = self.0.abs_diff(other.0);
        if distance < u32::MAX / 2 {
            self.0.partial_cmp(&other.0)
        } else {
            // wrap-around occurred, invert comparison
            other.0.partial_cmp(&self.0)
        }
    }
}

impl From<u32> for Serial {
    fn from(n: u32) -> Self {
        Serial(n)
    }
}

impl From<Serial> for u32 {
    fn from(serial: Serial) -> u32 {
        serial.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serial {
    /// Checks if a serial was generated after or is equal to another given serial
    pub fn is_no_older_than(&self, other: &Serial) -> bool {
        other <= self
    }
}

/// A counter for generating serials
///
/// Every [`CompositorState`](crate::wayland::CompositorState) owns exactly one counter, and
/// all components of that state draw their serials from it, ensuring their uniqueness for
/// the lifetime of the state.
///
/// The counter wraps around on overflow and never hands out `0`, ensuring it can run for
/// as long as needed.
#[derive(Debug)]
pub struct SerialCounter {
    serial: Cell<u32>,
}

impl Default for SerialCounter {
    fn default() -> Self {
        SerialCounter::new(1)
    }
}

impl SerialCounter {
    /// Create a counter whose first serial will be `initial`
    pub fn new(initial: u32) -> Self {
        SerialCounter {
            serial: Cell::new(initial),
        }
    }

    /// Retrieve the next serial from the counter
    pub fn next_serial(&self) -> Serial {
        let mut current = self.serial.get();
        if current == 0 {
            current = 1;
        }
        self.serial.set(current.wrapping_add(1));
        Serial(current)
    }
}
