//! Event loop integration
//!
//! Connections are usually served by their own threads, but the protocol state must only
//! ever be mutated by one logical owner. [`insert_dispatcher`] creates a channel whose
//! receiving end lives in a [`calloop`] event loop: requests sent through the returned
//! [`Sender`] from any thread are processed by the [`CompositorState`] one at a time, in
//! the order they were sent.
//!
//! ```no_run
//! use calloop::EventLoop;
//! use waysync::backend::buffer::ShmIntegration;
//! use waysync::dispatch::{insert_dispatcher, ClientMessage};
//! use waysync::wayland::{CompositorConfig, CompositorState};
//!
//! let mut event_loop = EventLoop::<CompositorState>::try_new().unwrap();
//! let (sender, _token) = insert_dispatcher(&event_loop.handle()).unwrap();
//! let mut state = CompositorState::new(CompositorConfig::default(), ShmIntegration::new());
//!
//! std::thread::spawn(move || {
//!     // decode requests from a connection and forward them with `sender.send(..)`
//!     drop(sender);
//! });
//!
//! loop {
//!     event_loop.dispatch(None, &mut state).unwrap();
//!     for event in state.drain_events() {
//!         // deliver the event to its client
//!     }
//! }
//! ```

use calloop::channel::{self, Channel, Sender};
use calloop::{LoopHandle, RegistrationToken};
use thiserror::Error;
use tracing::{debug, trace};

use crate::utils::ClientId;
use crate::wayland::{CompositorState, Request};

/// A request, along with the client that sent it
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    /// the sending client
    pub client: ClientId,
    /// the request
    pub request: Request,
}

/// Errors that can occur when setting up the dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The channel could not be inserted into the event loop
    #[error("failed to insert the request channel into the event loop")]
    Insert(#[source] calloop::Error),
}

/// Insert a request channel into the event loop
///
/// Returns the sending end of the channel, and the token of the event source. The
/// channel stays registered when every sender is dropped, remove it with the token.
pub fn insert_dispatcher(
    handle: &LoopHandle<'_, CompositorState>,
) -> Result<(Sender<ClientMessage>, RegistrationToken), DispatchError> {
    let (sender, channel): (Sender<ClientMessage>, Channel<ClientMessage>) = channel::channel();
    let token = handle
        .insert_source(channel, |event, _, state: &mut CompositorState| match event {
            channel::Event::Msg(message) => {
                trace!(client = %message.client, "dispatching request");
                let _ = state.handle_request(message.client, message.request);
            }
            channel::Event::Closed => {
                debug!("all request senders were dropped");
            }
        })
        .map_err(|err| DispatchError::Insert(err.error))?;
    Ok((sender, token))
}
