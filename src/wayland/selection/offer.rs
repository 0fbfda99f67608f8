use crate::utils::{ClientId, OfferId, SourceId};

/// What an offer was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferKind {
    /// Announcing the selection
    Selection,
    /// Entering a surface during a drag'n'drop
    DragAndDrop,
}

/// A data offer, the destination-side view of a [`DataSource`](super::source::DataSource)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataOffer {
    pub(crate) id: OfferId,
    pub(crate) client: ClientId,
    pub(crate) source: SourceId,
    pub(crate) kind: OfferKind,
    pub(crate) active: bool,
}

impl DataOffer {
    /// Id of this offer
    pub fn id(&self) -> OfferId {
        self.id
    }

    /// The client this offer was sent to
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// The source backing this offer
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// What this offer was created for
    pub fn kind(&self) -> OfferKind {
        self.kind
    }

    /// Whether data can still be requested through this offer
    ///
    /// Offers are deactivated when their source is cancelled, when the selection they
    /// announced is replaced, or when the drag they belong to leaves the surface.
    pub fn is_active(&self) -> bool {
        self.active
    }
}
