// This module contains the test plumbing shared by the scenario tests

#![allow(dead_code)]

use waysync::backend::buffer::{BufferDescriptor, ShmFormat, ShmIntegration};
use waysync::client::Window;
use waysync::utils::{BufferHandle, ClientId, Logical, Size, SurfaceId};
use waysync::wayland::compositor::roles::RoleParams;
use waysync::wayland::{CompositorConfig, CompositorState, Event, Outcome, Request};

pub fn init_logging() {
    let _ = if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_test_writer().try_init()
    };
}

pub fn new_server() -> CompositorState {
    new_server_with(CompositorConfig::default())
}

pub fn new_server_with(config: CompositorConfig) -> CompositorState {
    init_logging();
    CompositorState::new(config, ShmIntegration::new())
}

/// Send a request that must succeed
pub fn request(state: &mut CompositorState, client: ClientId, request: Request) {
    let debug = format!("{:?}", request);
    assert_eq!(state.handle_request(client, request), Outcome::Handled, "{}", debug);
}

pub fn new_toplevel(state: &mut CompositorState, client: ClientId) -> SurfaceId {
    let surface = state.create_surface(client).unwrap();
    request(
        state,
        client,
        Request::SetRole {
            surface,
            role: RoleParams::Toplevel,
        },
    );
    surface
}

pub fn shm_buffer(state: &mut CompositorState, client: ClientId, size: Size<i32, Logical>) -> BufferHandle {
    state
        .import_buffer(
            client,
            BufferDescriptor::Shm {
                offset: 0,
                width: size.w,
                height: size.h,
                stride: size.w * 4,
                format: ShmFormat::Argb8888,
            },
        )
        .unwrap()
}

/// Attach a buffer of the given size and commit
pub fn present(state: &mut CompositorState, client: ClientId, surface: SurfaceId, size: Size<i32, Logical>) {
    let buffer = shm_buffer(state, client, size);
    request(
        state,
        client,
        Request::Attach {
            surface,
            buffer: Some(buffer),
            offset: (0, 0).into(),
        },
    );
    request(state, client, Request::Commit { surface });
}

/// Deliver the queued events to the window, and its requests to the compositor, until
/// both sides are idle
///
/// Returns every event that was emitted meanwhile.
pub fn roundtrip(state: &mut CompositorState, client: ClientId, window: &mut Window) -> Vec<Event> {
    let mut received = Vec::new();
    loop {
        let events = state.drain_events().collect::<Vec<_>>();
        for event in &events {
            window.handle_event(event);
        }
        received.extend(events);

        let requests = window.take_requests();
        if requests.is_empty() {
            return received;
        }
        for req in requests {
            request(state, client, req);
        }
    }
}
