mod helpers;

use helpers::{new_server, request};

use waysync::input::pointer::{ButtonState, GrabStatus};
use waysync::utils::{ClientId, Logical, Point, SourceId, SurfaceId};
use waysync::wayland::{CompositorState, Event, Outcome, Request};

const BTN_LEFT: u32 = 0x110;

struct Peer {
    client: ClientId,
    surface: SurfaceId,
}

/// Two clients with a bound data device, the first one offering a text source
///
/// Their surfaces are laid side by side: the source surface at `(0, 0)`, the other one at
/// `(100, 0)`.
fn setup() -> (CompositorState, Peer, Peer, SourceId) {
    let mut state = new_server();
    let mut peer = || {
        let client = state.connect_client();
        let surface = state.create_surface(client).unwrap();
        state.bind_data_device(client);
        Peer { client, surface }
    };
    let source_peer = peer();
    let target_peer = peer();
    let source = state
        .create_data_source(source_peer.client, ["text/plain", "text/html"])
        .unwrap();
    (state, source_peer, target_peer, source)
}

fn over(surface: SurfaceId, x: f64) -> Option<(SurfaceId, Point<f64, Logical>)> {
    Some((surface, (x, 0.0).into()))
}

fn start_drag(state: &mut CompositorState, origin: &Peer, source: Option<SourceId>) -> Outcome {
    state.pointer_motion((10.0, 10.0).into(), over(origin.surface, 0.0), 1);
    let serial = state.pointer_button(BTN_LEFT, ButtonState::Pressed, 2);
    state.handle_request(
        origin.client,
        Request::StartDrag {
            source,
            origin: origin.surface,
            icon: None,
            serial,
        },
    )
}

fn is_enter(event: &Event, client: ClientId) -> bool {
    matches!(event, Event::DragEnter { client: c, .. } if *c == client)
}

fn is_leave(event: &Event, client: ClientId) -> bool {
    matches!(event, Event::DragLeave { client: c } if *c == client)
}

#[test]
fn stale_drag_serial_is_ignored() {
    let (mut state, a, b, source) = setup();

    state.pointer_motion((10.0, 10.0).into(), over(a.surface, 0.0), 1);
    let serial = state.pointer_button(BTN_LEFT, ButtonState::Pressed, 2);
    state.pointer_button(BTN_LEFT, ButtonState::Released, 3);
    let _ = state.drain_events().count();

    let outcome = state.handle_request(
        a.client,
        Request::StartDrag {
            source: Some(source),
            origin: a.surface,
            icon: None,
            serial,
        },
    );
    assert_eq!(outcome, Outcome::Ignored);

    // a newer press does not revive the old serial either
    state.pointer_button(BTN_LEFT, ButtonState::Pressed, 4);
    let outcome = state.handle_request(
        a.client,
        Request::StartDrag {
            source: Some(source),
            origin: a.surface,
            icon: None,
            serial,
        },
    );
    assert_eq!(outcome, Outcome::Ignored);
    assert!(!state.data_device().is_dragging());

    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 5);
    assert!(state
        .drain_events()
        .all(|event| !matches!(event, Event::DragEnter { .. })));
    // the client is still connected, stale requests are not faults
    assert!(state.clients().contains(a.client));
}

#[test]
fn drag_needs_the_grab_button_held() {
    let (mut state, a, _b, source) = setup();
    const BTN_RIGHT: u32 = 0x111;

    state.pointer_motion((10.0, 10.0).into(), over(a.surface, 0.0), 1);
    let serial = state.pointer_button(BTN_LEFT, ButtonState::Pressed, 2);
    state.pointer_button(BTN_RIGHT, ButtonState::Pressed, 3);
    state.pointer_button(BTN_LEFT, ButtonState::Released, 4);
    // the implicit grab lives on while another button is held
    assert!(matches!(state.seat().get_pointer().grab(), GrabStatus::Implicit(_)));

    let outcome = state.handle_request(
        a.client,
        Request::StartDrag {
            source: Some(source),
            origin: a.surface,
            icon: None,
            serial,
        },
    );
    assert_eq!(outcome, Outcome::Ignored);
    assert!(!state.data_device().is_dragging());

    state.pointer_button(BTN_RIGHT, ButtonState::Released, 5);
    assert!(!state.data_device().is_dragging());
    assert_eq!(state.seat().get_pointer().grab(), &GrabStatus::None);
}

#[test]
fn drag_from_an_unfocused_surface_is_ignored() {
    let (mut state, a, b, source) = setup();
    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 1);
    let serial = state.pointer_button(BTN_LEFT, ButtonState::Pressed, 2);
    let outcome = state.handle_request(
        a.client,
        Request::StartDrag {
            source: Some(source),
            origin: a.surface,
            icon: None,
            serial,
        },
    );
    assert_eq!(outcome, Outcome::Ignored);
}

#[test]
fn leave_is_sent_before_enter() {
    let (mut state, a, b, source) = setup();
    assert_eq!(start_drag(&mut state, &a, Some(source)), Outcome::Handled);
    assert!(matches!(state.seat().get_pointer().grab(), GrabStatus::DnD(_)));

    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 3);
    state.pointer_motion((10.0, 10.0).into(), over(a.surface, 0.0), 4);
    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 5);
    let events = state.drain_events().collect::<Vec<_>>();

    // every enter is preceded by the leave of the previous focus
    let mut focus: Option<ClientId> = None;
    let mut enters = 0;
    for event in &events {
        match event {
            Event::DragEnter { client, .. } => {
                assert_eq!(focus, None, "enter without leave in {:?}", events);
                focus = Some(*client);
                enters += 1;
            }
            Event::DragLeave { client } => {
                assert_eq!(focus, Some(*client));
                focus = None;
            }
            _ => {}
        }
    }
    assert_eq!(enters, 4);
    assert_eq!(focus, Some(b.client));

    let leave = events.iter().position(|e| is_leave(e, a.client)).unwrap();
    let enter = events.iter().position(|e| is_enter(e, b.client)).unwrap();
    assert!(leave < enter);
}

#[test]
fn enter_carries_local_coordinates_and_an_offer() {
    let (mut state, a, b, source) = setup();
    assert_eq!(start_drag(&mut state, &a, Some(source)), Outcome::Handled);
    let _ = state.drain_events().count();

    state.pointer_motion((130.0, 20.0).into(), over(b.surface, 100.0), 3);
    state.pointer_motion((135.0, 25.0).into(), over(b.surface, 100.0), 4);
    let events = state.drain_events().collect::<Vec<_>>();

    let offer = match &events[..] {
        [Event::DragLeave { client: left }, Event::DataOffer {
            client: offered,
            offer,
            mime_types,
        }, Event::DragEnter {
            client: entered,
            surface,
            location,
            offer: Some(entered_offer),
            ..
        }, Event::DragMotion {
            client: moved,
            time: 4,
            location: motion,
        }] => {
            assert_eq!(*left, a.client);
            assert_eq!(*offered, b.client);
            assert_eq!(*entered, b.client);
            assert_eq!(*moved, b.client);
            assert_eq!(*surface, b.surface);
            assert_eq!(*location, (30.0, 20.0).into());
            assert_eq!(*motion, (35.0, 25.0).into());
            assert_eq!(mime_types, &vec!["text/plain".to_string(), "text/html".to_string()]);
            assert_eq!(offer, entered_offer);
            *offer
        }
        other => panic!("unexpected events {:?}", other),
    };
    assert_eq!(state.data_device().offer(offer).unwrap().source(), source);
}

#[test]
fn release_over_a_target_drops() {
    let (mut state, a, b, source) = setup();
    assert_eq!(start_drag(&mut state, &a, Some(source)), Outcome::Handled);
    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 3);
    let offer = state
        .drain_events()
        .find_map(|event| match event {
            Event::DragEnter { client, offer, .. } if client == b.client => offer,
            _ => None,
        })
        .unwrap();

    state.pointer_button(BTN_LEFT, ButtonState::Released, 4);
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::Drop { client: b.client }, Event::DragLeave { client: b.client }]
    );
    assert!(!state.data_device().is_dragging());
    assert_eq!(state.seat().get_pointer().grab(), &GrabStatus::None);

    // the data is then transferred through the offer
    request(
        &mut state,
        b.client,
        Request::OfferReceive {
            offer,
            mime_type: "text/plain".into(),
        },
    );
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::SourceSend {
            client: a.client,
            source,
            mime_type: "text/plain".into()
        }]
    );
}

#[test]
fn release_outside_of_any_surface_cancels() {
    let (mut state, a, _b, source) = setup();
    assert_eq!(start_drag(&mut state, &a, Some(source)), Outcome::Handled);
    state.pointer_motion((500.0, 500.0).into(), None, 3);
    let _ = state.drain_events().count();

    state.pointer_button(BTN_LEFT, ButtonState::Released, 4);
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::SourceCancelled {
            client: a.client,
            source
        }]
    );
    assert!(!state.data_device().is_dragging());
}

#[test]
fn destroying_the_source_cancels_the_drag() {
    let (mut state, a, b, source) = setup();
    assert_eq!(start_drag(&mut state, &a, Some(source)), Outcome::Handled);
    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 3);
    let _ = state.drain_events().count();

    request(&mut state, a.client, Request::DestroySource { source });
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::DragLeave { client: b.client }]
    );
    assert!(!state.data_device().is_dragging());
    // the button is still held, the pointer is back to its implicit grab
    assert!(matches!(state.seat().get_pointer().grab(), GrabStatus::Implicit(_)));

    state.pointer_button(BTN_LEFT, ButtonState::Released, 4);
    assert_eq!(state.drain_events().count(), 0);
}

#[test]
fn icon_only_drags_stay_within_the_client() {
    let (mut state, a, b, _source) = setup();
    let icon = state.create_surface(a.client).unwrap();
    state.pointer_motion((10.0, 10.0).into(), over(a.surface, 0.0), 1);
    let serial = state.pointer_button(BTN_LEFT, ButtonState::Pressed, 2);
    request(
        &mut state,
        a.client,
        Request::StartDrag {
            source: None,
            origin: a.surface,
            icon: Some(icon),
            serial,
        },
    );
    let events = state.drain_events().collect::<Vec<_>>();
    assert_eq!(events[0], Event::DragIconChanged { icon: Some(icon) });
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::DragEnter { client, offer: None, .. } if *client == a.client)));
    assert!(!events.iter().any(|e| matches!(e, Event::DataOffer { .. })));

    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 3);
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![
            Event::DragIconMoved {
                position: (110.0, 10.0).into()
            },
            Event::DragLeave { client: a.client },
        ]
    );
    assert_eq!(state.data_device().drag().unwrap().icon_position(), (110.0, 10.0).into());

    state.pointer_button(BTN_LEFT, ButtonState::Released, 4);
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::DragIconChanged { icon: None }]
    );
}

#[test]
fn clearing_an_empty_selection_never_offers() {
    let (mut state, a, b, _source) = setup();
    state.set_keyboard_focus(Some(b.surface));
    for _ in 0..2 {
        request(
            &mut state,
            a.client,
            Request::SetSelection {
                source: None,
                serial: 0.into(),
            },
        );
    }
    let events = state.drain_events().collect::<Vec<_>>();
    assert!(!events.is_empty());
    for event in events {
        match event {
            Event::Selection { offer, .. } => assert_eq!(offer, None),
            other => panic!("unexpected event {:?}", other),
        }
    }
}

#[test]
fn selection_follows_keyboard_focus() {
    let (mut state, a, b, source) = setup();
    state.set_keyboard_focus(Some(a.surface));
    // nothing to announce yet
    assert_eq!(state.drain_events().count(), 0);

    request(
        &mut state,
        a.client,
        Request::SetSelection {
            source: Some(source),
            serial: 0.into(),
        },
    );
    let events = state.drain_events().collect::<Vec<_>>();
    assert!(matches!(
        &events[..],
        [Event::DataOffer { client: c1, .. }, Event::Selection { client: c2, offer: Some(_) }]
            if *c1 == a.client && *c2 == a.client
    ));

    state.set_keyboard_focus(Some(b.surface));
    let events = state.drain_events().collect::<Vec<_>>();
    let offer = match &events[..] {
        [Event::DataOffer { client: c1, offer, .. }, Event::Selection {
            client: c2,
            offer: Some(announced),
        }] if *c1 == b.client && *c2 == b.client && offer == announced => *offer,
        other => panic!("unexpected events {:?}", other),
    };

    // a new selection supersedes the previous source and its offers
    let replacement = state.create_data_source(a.client, ["text/plain"]).unwrap();
    request(
        &mut state,
        a.client,
        Request::SetSelection {
            source: Some(replacement),
            serial: 0.into(),
        },
    );
    let events = state.drain_events().collect::<Vec<_>>();
    assert_eq!(
        events[0],
        Event::SourceCancelled {
            client: a.client,
            source
        }
    );
    assert_eq!(
        state.handle_request(
            b.client,
            Request::OfferReceive {
                offer,
                mime_type: "text/plain".into()
            }
        ),
        Outcome::Ignored
    );
}

#[test]
fn destroying_the_selection_source_clears_the_selection() {
    let (mut state, a, b, source) = setup();
    request(
        &mut state,
        a.client,
        Request::SetSelection {
            source: Some(source),
            serial: 0.into(),
        },
    );
    state.set_keyboard_focus(Some(b.surface));
    let _ = state.drain_events().count();

    request(&mut state, a.client, Request::DestroySource { source });
    assert_eq!(
        state.drain_events().collect::<Vec<_>>(),
        vec![Event::Selection {
            client: b.client,
            offer: None
        }]
    );
    assert_eq!(state.data_device().seat_data().selection(), None);
}

#[test]
fn foreign_sources_are_protocol_errors() {
    let (mut state, a, b, source) = setup();
    let outcome = state.handle_request(
        b.client,
        Request::SetSelection {
            source: Some(source),
            serial: 0.into(),
        },
    );
    assert!(matches!(outcome, Outcome::ClientFault(_)));
    assert!(!state.clients().contains(b.client));
    assert!(state.clients().contains(a.client));
}

#[test]
fn disconnecting_the_dragging_client_ends_the_drag() {
    let (mut state, a, b, source) = setup();
    assert_eq!(start_drag(&mut state, &a, Some(source)), Outcome::Handled);
    state.pointer_motion((110.0, 10.0).into(), over(b.surface, 100.0), 3);
    let _ = state.drain_events().count();

    state.disconnect_client(a.client);
    assert!(!state.data_device().is_dragging());
    assert!(state
        .drain_events()
        .any(|event| event == Event::DragLeave { client: b.client }));
    assert!(state.data_device().source(source).is_none());
}
