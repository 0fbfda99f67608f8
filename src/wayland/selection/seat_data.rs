use tracing::debug;

use crate::utils::{ClientId, IdGenerator, SourceId};
use crate::wayland::protocol::{Event, EventQueue, Outcome};

use super::{DataDeviceState, OfferKind};

/// Selection state of the seat
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeatData {
    selection: Option<SourceId>,
    focus: Option<ClientId>,
}

impl SeatData {
    /// The source backing the current selection
    pub fn selection(&self) -> Option<SourceId> {
        self.selection
    }

    /// The client the selection is announced to
    pub fn focus(&self) -> Option<ClientId> {
        self.focus
    }

    pub(crate) fn set_focus(&mut self, focus: Option<ClientId>) {
        self.focus = focus;
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selection = None;
    }
}

impl DataDeviceState {
    /// Set the selection to `source`, providing `None` will clear the selection
    ///
    /// The previous source is cancelled, and the new selection is announced to the client
    /// owning the keyboard focus.
    pub(crate) fn set_selection(
        &mut self,
        client: ClientId,
        source: Option<SourceId>,
        ids: &IdGenerator,
        events: &mut EventQueue,
    ) -> Outcome {
        if let Some(source) = source {
            if let Err(err) = self.client_source(client, source) {
                return Outcome::ClientFault(err);
            }
        }

        if let Some(previous) = self.seat_data.selection {
            if Some(previous) != source {
                if let Some(previous_source) = self.sources.get(&previous) {
                    debug!(source = %previous, "selection source cancelled");
                    events.push(Event::SourceCancelled {
                        client: previous_source.client(),
                        source: previous,
                    });
                }
                self.deactivate_offers(|offer| offer.source == previous && offer.kind == OfferKind::Selection);
            }
        }

        self.seat_data.selection = source;
        self.send_selection(ids, events);
        Outcome::Handled
    }

    /// Move the selection focus to another client
    ///
    /// The selection is only re-announced if there is one.
    pub(crate) fn set_selection_focus(
        &mut self,
        focus: Option<ClientId>,
        ids: &IdGenerator,
        events: &mut EventQueue,
    ) {
        self.seat_data.focus = focus;
        if self.seat_data.selection.is_some() {
            self.send_selection(ids, events);
        }
    }

    /// Announce the current selection to the focused client, if it has a data device
    pub(crate) fn send_selection(&mut self, ids: &IdGenerator, events: &mut EventQueue) {
        let Some(client) = self.seat_data.focus else {
            return;
        };
        if !self.has_data_device(client) {
            return;
        }
        let offer = match self.seat_data.selection {
            Some(source) => self.create_offer(client, source, OfferKind::Selection, ids, events),
            None => None,
        };
        events.push(Event::Selection { client, offer });
    }
}
