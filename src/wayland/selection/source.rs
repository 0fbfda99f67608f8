use smallvec::SmallVec;

use crate::utils::{ClientId, IsAlive, SourceId};

/// The metadata describing a data source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    /// The MIME types supported by this source
    pub mime_types: SmallVec<[String; 4]>,
}

impl SourceMetadata {
    /// Check whether the source offers the given `mime_type`.
    pub fn contains_mime_type(&self, mime_type: &str) -> bool {
        self.mime_types.iter().any(|m| m == mime_type)
    }
}

/// A data source offered by a client, for the selection or a drag'n'drop
#[derive(Debug)]
pub struct DataSource {
    id: SourceId,
    client: ClientId,
    metadata: SourceMetadata,
    alive: bool,
}

impl DataSource {
    pub(crate) fn new(id: SourceId, client: ClientId, metadata: SourceMetadata) -> Self {
        DataSource {
            id,
            client,
            metadata,
            alive: true,
        }
    }

    /// Id of this source
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// The client owning this source
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// The metadata of this source
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    pub(crate) fn destroy(&mut self) {
        self.alive = false;
    }
}

impl IsAlive for DataSource {
    fn alive(&self) -> bool {
        self.alive
    }
}
