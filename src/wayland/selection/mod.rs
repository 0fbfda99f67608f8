//! Utilities for manipulating the data devices
//!
//! The data device is wayland's clipboard and drag'n'drop mechanism. A client owning some
//! data creates a [`DataSource`] listing the mime types it can provide. Other clients never
//! see the source itself: the compositor hands them a [`DataOffer`] referring to it, through
//! which they can request the data in one of the offered mime types.
//!
//! This module tracks two independent operations on the single seat:
//!
//! - the *selection* (clipboard), which is announced to the client owning the keyboard
//!   focus, and re-announced whenever the keyboard focus moves to another client
//! - *drag'n'drop* sessions, which follow the pointer focus from the moment a client
//!   starts a drag until the pointer button is released
//!
//! Clients must first bind a data device (see
//! [`CompositorState::bind_data_device`](crate::wayland::CompositorState::bind_data_device))
//! to receive any of these events.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::utils::{ClientId, IdGenerator, IsAlive, OfferId, SourceId, SurfaceId};
use crate::wayland::protocol::{Event, EventQueue, Outcome, ProtocolError};

mod dnd_grab;
mod offer;
mod seat_data;
mod source;

pub use self::dnd_grab::DnDGrab;
pub use self::offer::{DataOffer, OfferKind};
pub use self::seat_data::SeatData;
pub use self::source::{DataSource, SourceMetadata};

/// State of the data device of the seat
#[derive(Debug, Default)]
pub struct DataDeviceState {
    known_devices: IndexSet<ClientId>,
    sources: IndexMap<SourceId, DataSource>,
    offers: IndexMap<OfferId, DataOffer>,
    seat_data: SeatData,
    drag: Option<DnDGrab>,
}

impl DataDeviceState {
    /// Create a new, empty, data device state
    pub fn new() -> Self {
        Self::default()
    }

    /// Access a data source
    pub fn source(&self, source: SourceId) -> Option<&DataSource> {
        self.sources.get(&source)
    }

    /// Access a data offer
    pub fn offer(&self, offer: OfferId) -> Option<&DataOffer> {
        self.offers.get(&offer)
    }

    /// The selection state of the seat
    pub fn seat_data(&self) -> &SeatData {
        &self.seat_data
    }

    /// The active drag'n'drop session, if any
    pub fn drag(&self) -> Option<&DnDGrab> {
        self.drag.as_ref()
    }

    /// Whether a drag'n'drop session is active
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether the client has bound a data device
    pub fn has_data_device(&self, client: ClientId) -> bool {
        self.known_devices.contains(&client)
    }

    pub(crate) fn bind_data_device(&mut self, client: ClientId, ids: &IdGenerator, events: &mut EventQueue) {
        if !self.known_devices.insert(client) {
            return;
        }
        trace!(client = %client, "data device bound");
        if self.seat_data.focus() == Some(client) && self.seat_data.selection().is_some() {
            self.send_selection(ids, events);
        }
    }

    pub(crate) fn create_source(&mut self, id: SourceId, client: ClientId, metadata: SourceMetadata) {
        trace!(source = %id, client = %client, mime_types = ?metadata.mime_types, "data source created");
        self.sources.insert(id, DataSource::new(id, client, metadata));
    }

    /// Resolve a source referenced by a client request
    pub(crate) fn client_source(&self, client: ClientId, source: SourceId) -> Result<&DataSource, ProtocolError> {
        let data_source = self
            .sources
            .get(&source)
            .filter(|s| s.alive())
            .ok_or(ProtocolError::UnknownSource(source))?;
        if data_source.client() != client {
            return Err(ProtocolError::ForeignObject(source.to_string()));
        }
        Ok(data_source)
    }

    /// Create an offer for `source`, advertising it to `client`
    pub(crate) fn create_offer(
        &mut self,
        client: ClientId,
        source: SourceId,
        kind: OfferKind,
        ids: &IdGenerator,
        events: &mut EventQueue,
    ) -> Option<OfferId> {
        let mime_types = self.sources.get(&source)?.metadata().mime_types.to_vec();
        let id: OfferId = ids.next();
        self.offers.insert(
            id,
            DataOffer {
                id,
                client,
                source,
                kind,
                active: true,
            },
        );
        events.push(Event::DataOffer {
            client,
            offer: id,
            mime_types,
        });
        Some(id)
    }

    /// Deactivate the offers matching a predicate
    pub(crate) fn deactivate_offers<F: Fn(&DataOffer) -> bool>(&mut self, filter: F) {
        for offer in self.offers.values_mut().filter(|offer| filter(offer)) {
            offer.active = false;
        }
    }

    pub(crate) fn offer_receive(
        &self,
        client: ClientId,
        offer: OfferId,
        mime_type: String,
        events: &mut EventQueue,
    ) -> Outcome {
        let Some(data_offer) = self.offers.get(&offer) else {
            debug!(offer = %offer, "receive on unknown offer");
            return Outcome::Ignored;
        };
        if data_offer.client != client {
            return Outcome::ClientFault(ProtocolError::ForeignObject(offer.to_string()));
        }
        if !data_offer.active {
            debug!(offer = %offer, "receive on inactive offer");
            return Outcome::Ignored;
        }
        let Some(source) = self.sources.get(&data_offer.source).filter(|s| s.alive()) else {
            return Outcome::Ignored;
        };
        if !source.metadata().contains_mime_type(&mime_type) {
            debug!(offer = %offer, mime_type, "mime type not offered");
            return Outcome::Ignored;
        }
        events.push(Event::SourceSend {
            client: source.client(),
            source: source.id(),
            mime_type,
        });
        Outcome::Handled
    }

    pub(crate) fn destroy_offer(&mut self, client: ClientId, offer: OfferId) -> Outcome {
        match self.offers.get(&offer) {
            None => Outcome::Ignored,
            Some(data_offer) if data_offer.client != client => {
                Outcome::ClientFault(ProtocolError::ForeignObject(offer.to_string()))
            }
            Some(_) => {
                self.offers.shift_remove(&offer);
                Outcome::Handled
            }
        }
    }

    /// A source was destroyed by its client
    ///
    /// Returns `true` if this ended the drag'n'drop session.
    pub(crate) fn source_destroyed(
        &mut self,
        client: ClientId,
        source: SourceId,
        ids: &IdGenerator,
        events: &mut EventQueue,
    ) -> Result<bool, ProtocolError> {
        self.client_source(client, source)?;
        Ok(self.drop_source(source, ids, events))
    }

    fn drop_source(&mut self, source: SourceId, ids: &IdGenerator, events: &mut EventQueue) -> bool {
        if let Some(mut data_source) = self.sources.shift_remove(&source) {
            data_source.destroy();
        }
        self.offers.retain(|_, offer| offer.source != source);

        if self.seat_data.selection() == Some(source) {
            debug!(source = %source, "selection source destroyed");
            self.seat_data.clear_selection();
            self.send_selection(ids, events);
        }

        if self.drag.as_ref().and_then(|drag| drag.source()) == Some(source) {
            debug!(source = %source, "drag source destroyed, cancelling the drag");
            self.cancel_drag(events);
            true
        } else {
            false
        }
    }

    /// A surface was destroyed
    ///
    /// Returns `true` if this ended the drag'n'drop session.
    pub(crate) fn surface_destroyed(&mut self, surface: SurfaceId, events: &mut EventQueue) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        if drag.origin() == surface {
            self.cancel_drag(events);
            return true;
        }
        if drag.icon == Some(surface) {
            drag.icon = None;
            events.push(Event::DragIconChanged { icon: None });
        }
        if drag.focus.map(|focus| focus.surface) == Some(surface) {
            drag.focus = None;
            if let Some(offer) = drag.offer.take() {
                self.deactivate_offers(|o| o.id == offer);
            }
        }
        false
    }

    /// A client disconnected
    ///
    /// Returns `true` if this ended the drag'n'drop session.
    pub(crate) fn client_disconnected(
        &mut self,
        client: ClientId,
        ids: &IdGenerator,
        events: &mut EventQueue,
    ) -> bool {
        self.known_devices.shift_remove(&client);
        self.offers.retain(|_, offer| offer.client != client);

        let mut ended = false;
        if self.drag.as_ref().map(|drag| drag.client() == client).unwrap_or(false) {
            self.cancel_drag(events);
            ended = true;
        }
        if let Some(drag) = self.drag.as_mut() {
            if drag.focus.map(|focus| focus.client) == Some(client) {
                drag.focus = None;
                drag.offer = None;
            }
        }

        let owned = self
            .sources
            .values()
            .filter(|source| source.client() == client)
            .map(|source| source.id())
            .collect::<Vec<_>>();
        for source in owned {
            ended |= self.drop_source(source, ids, events);
        }

        if self.seat_data.focus() == Some(client) {
            self.seat_data.set_focus(None);
        }
        ended
    }
}
