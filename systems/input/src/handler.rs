//! Handlers watching a single input condition.

use std::{fmt, sync::Mutex};

use crate::{
    frame::{InputFrame, InputPhase, Key, MouseButton, ScreenRect},
    InputError,
};

/// What a handler watches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputCondition {
    /// A keyboard key.
    Key(Key),
    /// A mouse button.
    MouseButton(MouseButton),
    /// The cursor lying inside a screen rectangle.
    CursorIn(ScreenRect),
}

/// Identifies the owner of subscriptions so they can be dropped together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u32);

impl SubscriberId {
    /// Creates an identifier from its raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Delivered to subscribers when their condition fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputSignal {
    /// Condition of the handler that fired.
    pub condition: InputCondition,
    /// Phase that fired.
    pub phase: InputPhase,
}

type Callback = Box<dyn FnMut(InputSignal) + Send>;

struct Subscription {
    owner: SubscriberId,
    phase: InputPhase,
    callback: Callback,
}

/// Fires subscribed callbacks when its condition is met.
///
/// Callbacks run while the handler's subscriber list is locked and must not
/// subscribe to or unsubscribe from the same handler.
pub struct InputHandler {
    condition: InputCondition,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl fmt::Debug for InputHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputHandler")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

impl InputHandler {
    pub(crate) fn new(condition: InputCondition) -> Self {
        Self {
            condition,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Condition the handler watches.
    #[must_use]
    pub fn condition(&self) -> InputCondition {
        self.condition
    }

    /// Calls `callback` whenever the condition fires in `phase`.
    pub fn subscribe<F>(
        &self,
        owner: SubscriberId,
        phase: InputPhase,
        callback: F,
    ) -> Result<(), InputError>
    where
        F: FnMut(InputSignal) + Send + 'static,
    {
        let mut subscriptions = self.subscriptions.lock().map_err(|_| InputError::Poisoned)?;
        subscriptions.push(Subscription {
            owner,
            phase,
            callback: Box::new(callback),
        });
        Ok(())
    }

    /// Drops every subscription of `owner`. Returns how many were dropped.
    pub fn unsubscribe(&self, owner: SubscriberId) -> Result<usize, InputError> {
        let mut subscriptions = self.subscriptions.lock().map_err(|_| InputError::Poisoned)?;
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.owner != owner);
        Ok(before - subscriptions.len())
    }

    /// Drops every subscription.
    pub fn unsubscribe_all(&self) -> Result<(), InputError> {
        self.subscriptions
            .lock()
            .map_err(|_| InputError::Poisoned)?
            .clear();
        Ok(())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> Result<usize, InputError> {
        Ok(self
            .subscriptions
            .lock()
            .map_err(|_| InputError::Poisoned)?
            .len())
    }

    /// Checks the condition against `frame` and notifies subscribers.
    ///
    /// Keys and buttons fire `Up`, then `Held`, then `Down`, so a release is
    /// seen before a press landing in the same frame.
    pub fn check_input(&self, frame: &InputFrame) -> Result<(), InputError> {
        const ORDER: [InputPhase; 3] = [InputPhase::Up, InputPhase::Held, InputPhase::Down];

        let fired: Vec<InputPhase> = match self.condition {
            InputCondition::Key(key) => ORDER
                .into_iter()
                .filter(|phase| frame.key(key, *phase))
                .collect(),
            InputCondition::MouseButton(button) => ORDER
                .into_iter()
                .filter(|phase| frame.button(button, *phase))
                .collect(),
            InputCondition::CursorIn(rect) => {
                if rect.contains(frame.cursor) {
                    vec![InputPhase::Held]
                } else {
                    Vec::new()
                }
            }
        };
        if fired.is_empty() {
            return Ok(());
        }

        let mut subscriptions = self.subscriptions.lock().map_err(|_| InputError::Poisoned)?;
        for phase in fired {
            let signal = InputSignal {
                condition: self.condition,
                phase,
            };
            for subscription in subscriptions.iter_mut() {
                if subscription.phase == phase {
                    (subscription.callback)(signal);
                }
            }
        }
        Ok(())
    }
}
