//! Connected clients and their window-manager metadata
//!
//! Besides tracking which clients are connected, the registry stores what the window
//! manager integration learns about them: the process they run in, whether they
//! authenticated, and the window properties they publish on their surfaces.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::utils::{ClientId, SurfaceId};

/// Metadata of a connected client
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ManagedClient {
    process_id: Option<u32>,
    authentication_token: Option<String>,
    window_properties: HashMap<(SurfaceId, String), Vec<u8>>,
}

impl ManagedClient {
    /// The process id the client mapped itself to
    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    /// Whether the client authenticated itself
    pub fn is_authenticated(&self) -> bool {
        self.authentication_token.is_some()
    }

    /// The token the client authenticated with
    pub fn authentication_token(&self) -> Option<&str> {
        self.authentication_token.as_deref()
    }

    /// Value of a window property of one of the surfaces of the client
    pub fn window_property(&self, surface: SurfaceId, name: &str) -> Option<&[u8]> {
        self.window_properties
            .get(&(surface, name.to_owned()))
            .map(Vec::as_slice)
    }
}

/// Registry of the connected clients
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: IndexMap<ClientId, ManagedClient>,
}

impl ClientRegistry {
    /// Whether the client is connected
    pub fn contains(&self, client: ClientId) -> bool {
        self.clients.contains_key(&client)
    }

    /// Access the metadata of a client
    pub fn get(&self, client: ClientId) -> Option<&ManagedClient> {
        self.clients.get(&client)
    }

    /// Iterate over the connected clients, in connection order
    pub fn ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.clients.keys().copied()
    }

    /// Find the client running in a given process
    pub fn find_by_process(&self, process_id: u32) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, client)| client.process_id == Some(process_id))
            .map(|(id, _)| *id)
    }

    pub(crate) fn insert(&mut self, client: ClientId) {
        self.clients.insert(client, ManagedClient::default());
    }

    pub(crate) fn remove(&mut self, client: ClientId) -> Option<ManagedClient> {
        self.clients.shift_remove(&client)
    }

    pub(crate) fn map_to_process(&mut self, client: ClientId, process_id: u32) -> bool {
        match self.clients.get_mut(&client) {
            Some(managed) => {
                debug!(client = %client, process_id, "client mapped to process");
                managed.process_id = Some(process_id);
                true
            }
            None => false,
        }
    }

    /// Record the authentication token of a client
    ///
    /// Returns `true` the first time the client authenticates.
    pub(crate) fn authenticate(&mut self, client: ClientId, token: String) -> bool {
        match self.clients.get_mut(&client) {
            Some(managed) => managed.authentication_token.replace(token).is_none(),
            None => false,
        }
    }

    pub(crate) fn set_window_property(
        &mut self,
        client: ClientId,
        surface: SurfaceId,
        name: String,
        value: Vec<u8>,
    ) -> bool {
        match self.clients.get_mut(&client) {
            Some(managed) => {
                managed.window_properties.insert((surface, name), value);
                true
            }
            None => false,
        }
    }

    pub(crate) fn surface_destroyed(&mut self, client: ClientId, surface: SurfaceId) {
        if let Some(managed) = self.clients.get_mut(&client) {
            managed.window_properties.retain(|(s, _), _| *s != surface);
        }
    }
}
