use crate::utils::{Logical, Point, Serial};

use super::PointerFocus;

/// Data about the event that started the grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabStartData {
    /// The focused surface and its location, if any, at the start of the grab.
    pub focus: Option<PointerFocus>,
    /// The button that initiated the grab.
    pub button: u32,
    /// Serial of the button press that initiated the grab.
    pub serial: Serial,
    /// The location of the click that initiated the grab, in the global compositor space.
    pub location: Point<f64, Logical>,
}

/// Who currently owns the pointer
///
/// A button press on a surface starts an implicit grab: the pointer focus stays on that
/// surface until every button is released. A drag'n'drop session replaces the implicit
/// grab with an exclusive one, which only the data device may end.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum GrabStatus {
    /// No grab is active
    #[default]
    None,
    /// Implicit grab of a button press
    Implicit(GrabStartData),
    /// Exclusive grab of a drag'n'drop session
    DnD(GrabStartData),
}

impl GrabStatus {
    /// The data about the event that started the grab
    pub fn start_data(&self) -> Option<&GrabStartData> {
        match self {
            GrabStatus::None => None,
            GrabStatus::Implicit(data) | GrabStatus::DnD(data) => Some(data),
        }
    }
}
