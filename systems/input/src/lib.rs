#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Registry of input handlers shared between the frame loop and background
//! threads.
//!
//! The frame loop checks every handler under a read lock once per frame.
//! Handler registration takes the write lock; [`InputProvider::handler_async`]
//! performs it on a worker thread so a callback running inside the frame
//! check can ask for a new handler without waiting on the lock it is already
//! inside of.

pub mod frame;
pub mod handler;

use std::{
    sync::{Arc, RwLock},
    thread::{self, JoinHandle},
};

use thiserror::Error;
use tracing::debug;

pub use frame::{InputFrame, InputPhase, Key, MouseButton, ScreenRect};
pub use handler::{InputCondition, InputHandler, InputSignal, SubscriberId};

/// Errors reported by the input registry.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// A thread panicked while holding one of the registry locks.
    #[error("input handler lock poisoned")]
    Poisoned,
}

/// Owns the input handlers. Clones share the same registry.
#[derive(Clone, Debug, Default)]
pub struct InputProvider {
    handlers: Arc<RwLock<Vec<Arc<InputHandler>>>>,
}

impl InputProvider {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler watching `condition`, creating it if needed.
    pub fn handler(&self, condition: InputCondition) -> Result<Arc<InputHandler>, InputError> {
        let mut handlers = self.handlers.write().map_err(|_| InputError::Poisoned)?;
        if let Some(handler) = handlers.iter().find(|handler| handler.condition() == condition) {
            return Ok(Arc::clone(handler));
        }

        debug!(?condition, "created input handler");
        let handler = Arc::new(InputHandler::new(condition));
        handlers.push(Arc::clone(&handler));
        Ok(handler)
    }

    /// Same as [`InputProvider::handler`], run on a worker thread.
    #[must_use = "join the handle to obtain the handler"]
    pub fn handler_async(
        &self,
        condition: InputCondition,
    ) -> JoinHandle<Result<Arc<InputHandler>, InputError>> {
        let provider = self.clone();
        thread::spawn(move || provider.handler(condition))
    }

    /// Checks every handler against `frame`.
    pub fn handle_input(&self, frame: &InputFrame) -> Result<(), InputError> {
        let handlers = self.handlers.read().map_err(|_| InputError::Poisoned)?;
        for handler in handlers.iter() {
            handler.check_input(frame)?;
        }
        Ok(())
    }

    /// Drops every subscription of `owner` from every handler.
    pub fn unsubscribe(&self, owner: SubscriberId) -> Result<usize, InputError> {
        let handlers = self.handlers.read().map_err(|_| InputError::Poisoned)?;
        handlers
            .iter()
            .map(|handler| handler.unsubscribe(owner))
            .sum()
    }

    /// Drops every subscription and every handler.
    pub fn clear(&self) -> Result<(), InputError> {
        let mut handlers = self.handlers.write().map_err(|_| InputError::Poisoned)?;
        for handler in handlers.iter() {
            handler.unsubscribe_all()?;
        }
        handlers.clear();
        Ok(())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> Result<usize, InputError> {
        Ok(self.handlers.read().map_err(|_| InputError::Poisoned)?.len())
    }

    /// Reports whether no handler is registered.
    pub fn is_empty(&self) -> Result<bool, InputError> {
        self.len().map(|len| len == 0)
    }
}
