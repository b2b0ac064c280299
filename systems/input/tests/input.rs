use std::sync::{mpsc, Arc};

use throne_defence_core::Vec2;
use throne_defence_system_input::{
    InputCondition, InputFrame, InputPhase, InputProvider, Key, MouseButton, ScreenRect,
    SubscriberId,
};

const LEFT: InputCondition = InputCondition::MouseButton(MouseButton::Left);
const OWNER: SubscriberId = SubscriberId::new(1);

#[test]
fn handlers_are_shared_per_condition() {
    let provider = InputProvider::new();
    let first = provider.handler(LEFT).expect("handler");
    let again = provider.handler(LEFT).expect("handler");
    let escape = provider
        .handler(InputCondition::Key(Key::Escape))
        .expect("handler");

    assert!(Arc::ptr_eq(&first, &again));
    assert!(!Arc::ptr_eq(&first, &escape));
    assert_eq!(provider.len(), Ok(2));
}

#[test]
fn mouse_phases_fire_up_then_held_then_down() {
    let provider = InputProvider::new();
    let handler = provider.handler(LEFT).expect("handler");
    let (sender, receiver) = mpsc::channel();
    for phase in [InputPhase::Down, InputPhase::Held, InputPhase::Up] {
        let sender = sender.clone();
        handler
            .subscribe(OWNER, phase, move |signal| {
                let _ = sender.send(signal.phase);
            })
            .expect("subscribe");
    }

    let frame = InputFrame::new(Vec2::ZERO)
        .button_released(MouseButton::Left)
        .button_pressed(MouseButton::Left);
    provider.handle_input(&frame).expect("handle");

    let fired: Vec<_> = receiver.try_iter().collect();
    assert_eq!(fired, vec![InputPhase::Up, InputPhase::Held, InputPhase::Down]);
}

#[test]
fn cursor_conditions_fire_while_inside() {
    let provider = InputProvider::new();
    let panel = ScreenRect::from_corners(Vec2::ZERO, Vec2::new(100.0, 40.0));
    let handler = provider
        .handler(InputCondition::CursorIn(panel))
        .expect("handler");
    let (sender, receiver) = mpsc::channel();
    handler
        .subscribe(OWNER, InputPhase::Held, move |_| {
            let _ = sender.send(());
        })
        .expect("subscribe");

    provider
        .handle_input(&InputFrame::new(Vec2::new(50.0, 20.0)))
        .expect("handle");
    provider
        .handle_input(&InputFrame::new(Vec2::new(150.0, 20.0)))
        .expect("handle");

    assert_eq!(receiver.try_iter().count(), 1);
}

#[test]
fn unsubscribing_an_owner_leaves_others() {
    let provider = InputProvider::new();
    let escape = provider
        .handler(InputCondition::Key(Key::Escape))
        .expect("handler");
    let other = SubscriberId::new(2);
    let (sender, receiver) = mpsc::channel();
    for owner in [OWNER, other] {
        let sender = sender.clone();
        escape
            .subscribe(owner, InputPhase::Down, move |_| {
                let _ = sender.send(owner);
            })
            .expect("subscribe");
    }

    assert_eq!(provider.unsubscribe(OWNER), Ok(1));
    provider
        .handle_input(&InputFrame::new(Vec2::ZERO).key_pressed(Key::Escape))
        .expect("handle");
    assert_eq!(receiver.try_iter().collect::<Vec<_>>(), vec![other]);

    provider.clear().expect("clear");
    assert_eq!(escape.subscriber_count(), Ok(0));
    assert_eq!(provider.is_empty(), Ok(true));
}

#[test]
fn handlers_can_be_requested_from_inside_a_callback() {
    let provider = InputProvider::new();
    let left = provider.handler(LEFT).expect("handler");
    let (sender, receiver) = mpsc::channel();
    let requester = provider.clone();
    left.subscribe(OWNER, InputPhase::Down, move |_| {
        // The frame check holds the read lock; registration waits for it on
        // a worker thread.
        let _ = sender.send(requester.handler_async(InputCondition::Key(Key::char('q'))));
    })
    .expect("subscribe");

    provider
        .handle_input(&InputFrame::new(Vec2::ZERO).button_pressed(MouseButton::Left))
        .expect("handle");

    let pending = receiver.recv().expect("callback ran");
    let created = pending.join().expect("worker finished").expect("handler");
    assert_eq!(created.condition(), InputCondition::Key(Key::Char('Q')));
    assert_eq!(provider.len(), Ok(2));
}
