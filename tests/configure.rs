mod helpers;

use helpers::{new_server, new_server_with, new_toplevel, present, request, roundtrip};

use waysync::client::{Window, WindowEvent, WindowState};
use waysync::utils::Serial;
use waysync::wayland::shell::xdg::ToplevelStates;
use waysync::wayland::shell::PingError;
use waysync::wayland::{CompositorConfig, Event, Outcome, ProtocolError, Request};

#[test]
fn configure_size() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let mut window = Window::new(surface, (64, 48));

    // the first commit triggers the initial configure
    request(&mut state, client, Request::Commit { surface });
    let serial = state
        .send_configure(surface, (60, 40).into(), ToplevelStates::empty())
        .unwrap();
    let events = roundtrip(&mut state, client, &mut window);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::ToplevelConfigure { configure, .. } if configure.serial == serial
    )));
    assert_eq!(window.size(), (60, 40).into());

    present(&mut state, client, surface, window.size());
    assert_eq!(state.surface_size(surface), Some((60, 40).into()));
    let toplevel = state.xdg().toplevel(surface).unwrap();
    assert_eq!(toplevel.current_state().size, (60, 40).into());
    assert_eq!(toplevel.attributes().configure_serial, Some(serial));
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::Committed { surface }]
    );
}

#[test]
fn commit_before_ack_is_applied_on_ack() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);

    present(&mut state, client, surface, (64, 48).into());
    assert!(!state.is_exposable(surface));
    assert!(state.surface(surface).unwrap().has_blocked_commit());
    assert_eq!(state.surface_size(surface), None);

    let events = state.drain_events().collect::<Vec<_>>();
    let serial = match events.as_slice() {
        [Event::ToplevelConfigure { configure, .. }] => configure.serial,
        other => panic!("unexpected events {:?}", other),
    };

    request(&mut state, client, Request::AckConfigure { surface, serial });
    assert!(state.is_exposable(surface));
    assert_eq!(state.surface_size(surface), Some((64, 48).into()));
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::Committed { surface }]
    );
}

#[test]
fn ack_supersedes_older_configures() {
    let sizes = [(100, 100), (200, 150), (300, 200)];

    let mut acked_all = new_server_with(CompositorConfig {
        send_initial_configure: false,
        ..Default::default()
    });
    let mut acked_last = new_server_with(CompositorConfig {
        send_initial_configure: false,
        ..Default::default()
    });

    let mut results = Vec::new();
    for (state, ack_all) in [(&mut acked_all, true), (&mut acked_last, false)] {
        let client = state.connect_client();
        let surface = new_toplevel(state, client);
        let serials = sizes
            .iter()
            .map(|size| {
                state
                    .send_configure(surface, (*size).into(), ToplevelStates::ACTIVATED)
                    .unwrap()
            })
            .collect::<Vec<_>>();

        let to_ack = if ack_all { &serials[..] } else { &serials[2..] };
        for serial in to_ack {
            request(state, client, Request::AckConfigure { surface, serial: *serial });
        }
        present(state, client, surface, (300, 200).into());
        let toplevel = state.xdg().toplevel(surface).unwrap();
        assert_eq!(toplevel.attributes().pending_serials().count(), 0);
        results.push((toplevel.current_state(), state.surface_size(surface)));

        // older configures can no longer be acked
        let outcome = state.handle_request(
            client,
            Request::AckConfigure {
                surface,
                serial: serials[0],
            },
        );
        assert_eq!(
            outcome,
            Outcome::ClientFault(ProtocolError::InvalidConfigureSerial {
                surface,
                serial: serials[0]
            })
        );
        assert!(!state.clients().contains(client));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].0.size, (300, 200).into());
}

#[test]
fn unknown_serial_is_a_protocol_error() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let outcome = state.handle_request(
        client,
        Request::AckConfigure {
            surface,
            serial: Serial::from(1234),
        },
    );
    assert!(matches!(
        outcome,
        Outcome::ClientFault(ProtocolError::InvalidConfigureSerial { .. })
    ));
    let events = state.drain_events().collect::<Vec<_>>();
    assert_eq!(
        events.last(),
        Some(&Event::ProtocolError {
            client,
            error: ProtocolError::InvalidConfigureSerial {
                surface,
                serial: Serial::from(1234)
            }
        })
    );
}

#[test]
fn exposure_is_permanent() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let mut window = Window::new(surface, (64, 48));

    request(&mut state, client, Request::Commit { surface });
    assert!(!state.is_exposable(surface));
    assert!(!window.is_exposed());

    roundtrip(&mut state, client, &mut window);
    assert!(window.is_exposed());
    assert!(state.is_exposable(surface));
    present(&mut state, client, surface, window.size());

    // configures the client did not answer yet do not hide it
    state.send_configure(surface, (10, 10).into(), ToplevelStates::empty());
    state.send_configure(surface, (20, 20).into(), ToplevelStates::empty());
    assert!(state.is_exposable(surface));

    // and a commit made meanwhile still applies immediately
    present(&mut state, client, surface, (64, 48).into());
    let events = roundtrip(&mut state, client, &mut window);
    assert!(events.contains(&Event::Committed { surface }));
    assert!(window.is_exposed());
    assert_eq!(
        window
            .take_events()
            .iter()
            .filter(|event| **event == WindowEvent::Exposed)
            .count(),
        1
    );
}

#[test]
fn configure_states() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let mut window = Window::new(surface, (64, 48));
    request(&mut state, client, Request::Commit { surface });
    roundtrip(&mut state, client, &mut window);

    let windowed_size = (320, 240).into();
    state.send_configure(surface, windowed_size, ToplevelStates::ACTIVATED);
    roundtrip(&mut state, client, &mut window);
    present(&mut state, client, surface, window.size());
    assert_eq!(window.window_state(), WindowState::Windowed);
    assert_eq!(window.size(), windowed_size);
    assert!(window.is_active());

    let screen_size = (640, 480).into();
    state.send_configure(
        surface,
        screen_size,
        ToplevelStates::ACTIVATED | ToplevelStates::MAXIMIZED,
    );
    roundtrip(&mut state, client, &mut window);
    present(&mut state, client, surface, window.size());
    assert_eq!(window.window_state(), WindowState::Maximized);
    assert_eq!(window.size(), screen_size);

    state.send_configure(
        surface,
        screen_size,
        ToplevelStates::ACTIVATED | ToplevelStates::FULLSCREEN,
    );
    roundtrip(&mut state, client, &mut window);
    present(&mut state, client, surface, window.size());
    assert_eq!(window.window_state(), WindowState::Fullscreen);
    assert_eq!(window.size(), screen_size);

    // the window remembers its original size
    state.send_configure(surface, (0, 0).into(), ToplevelStates::ACTIVATED);
    roundtrip(&mut state, client, &mut window);
    present(&mut state, client, surface, window.size());
    assert_eq!(window.window_state(), WindowState::Windowed);
    assert_eq!(window.states(), ToplevelStates::ACTIVATED);
    assert_eq!(window.size(), windowed_size);
    assert_eq!(state.surface_size(surface), Some(windowed_size));
    assert_eq!(
        state.xdg().toplevel(surface).unwrap().current_state().states,
        ToplevelStates::ACTIVATED
    );
}

#[test]
fn state_change_is_notified_once() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let mut window = Window::new(surface, (64, 48));
    request(&mut state, client, Request::Commit { surface });
    roundtrip(&mut state, client, &mut window);
    window.take_events();

    state.send_configure(
        surface,
        (640, 480).into(),
        ToplevelStates::ACTIVATED | ToplevelStates::FULLSCREEN,
    );
    roundtrip(&mut state, client, &mut window);
    let changes = window
        .take_events()
        .into_iter()
        .filter(|event| matches!(event, WindowEvent::StateChanged { .. }))
        .collect::<Vec<_>>();
    assert_eq!(
        changes,
        vec![WindowEvent::StateChanged {
            old: ToplevelStates::empty(),
            new: ToplevelStates::ACTIVATED | ToplevelStates::FULLSCREEN,
        }]
    );
}

#[test]
fn maximize_request_restores_windowed_size() {
    let mut state = new_server_with(CompositorConfig {
        output_size: (800, 600).into(),
        ..Default::default()
    });
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let mut window = Window::new(surface, (300, 200));
    request(&mut state, client, Request::Commit { surface });
    roundtrip(&mut state, client, &mut window);
    present(&mut state, client, surface, window.size());

    window.request_maximize();
    roundtrip(&mut state, client, &mut window);
    assert_eq!(window.window_state(), WindowState::Maximized);
    assert_eq!(window.size(), (800, 600).into());

    window.request_fullscreen();
    roundtrip(&mut state, client, &mut window);
    window.request_unmaximize();
    roundtrip(&mut state, client, &mut window);
    // still fullscreen, the compositor keeps imposing its size
    assert_eq!(window.window_state(), WindowState::Fullscreen);
    assert_eq!(window.size(), (800, 600).into());

    window.request_unfullscreen();
    roundtrip(&mut state, client, &mut window);
    assert_eq!(window.window_state(), WindowState::Windowed);
    assert_eq!(window.size(), (300, 200).into());
}

#[test]
fn minimize_is_only_forwarded_to_the_compositor() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let mut window = Window::new(surface, (300, 200));
    request(&mut state, client, Request::Commit { surface });
    roundtrip(&mut state, client, &mut window);

    window.request_minimize();
    let events = roundtrip(&mut state, client, &mut window);
    assert_eq!(events, vec![Event::MinimizeRequested { surface }]);
    assert_eq!(window.window_state(), WindowState::Windowed);
}

#[test]
fn close_and_ping() {
    let mut state = new_server();
    let client = state.connect_client();
    let surface = new_toplevel(&mut state, client);
    let mut window = Window::new(surface, (300, 200));

    state.send_close(surface).unwrap();
    roundtrip(&mut state, client, &mut window);
    assert_eq!(window.take_events(), vec![WindowEvent::CloseRequested]);

    let serial = state.send_ping(client).unwrap();
    assert_eq!(state.send_ping(client), Err(PingError::PingAlreadyPending(serial)));
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::Ping { client, serial }]
    );
    request(&mut state, client, Request::Pong { serial });
    assert!(state.xdg().pending_ping(client).is_none());
    assert_eq!(
        state.handle_request(client, Request::Pong { serial }),
        Outcome::Ignored
    );

    state.disconnect_client(client);
    assert_eq!(state.send_ping(client), Err(PingError::DeadClient));
}
