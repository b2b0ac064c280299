//! Hand-off of messages from worker threads to the frame loop.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use thiserror::Error;
use tracing::debug;

/// Errors reported by the cross-thread queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The receiving queue was dropped.
    #[error("main thread queue is closed")]
    Disconnected,
    /// A timer period of zero was requested.
    #[error("timer period must be positive")]
    ZeroPeriod,
}

/// Messages waiting to be handled by the frame loop.
#[derive(Debug)]
pub struct MainThreadQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Default for MainThreadQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MainThreadQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Sending half that may move to other threads.
    #[must_use]
    pub fn sender(&self) -> QueueSender<T> {
        QueueSender {
            sender: self.sender.clone(),
        }
    }

    /// Moves every queued message into `out` without blocking.
    pub fn drain(&self, out: &mut Vec<T>) {
        out.extend(self.receiver.try_iter());
    }

    /// Blocks up to `timeout` for the next message.
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// Sending half of a [`MainThreadQueue`].
#[derive(Debug)]
pub struct QueueSender<T> {
    sender: Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Queues `message` for the frame loop.
    pub fn send(&self, message: T) -> Result<(), SchedulerError> {
        self.sender
            .send(message)
            .map_err(|_| SchedulerError::Disconnected)
    }
}

/// Thread that pushes a message onto a queue once per period.
///
/// The thread exits when stopped, when dropped, or when the queue goes away.
#[derive(Debug)]
pub struct BackgroundTimer {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundTimer {
    /// Starts a thread that sends `make()` to `queue` every `period`.
    pub fn start<T, F>(
        period: Duration,
        queue: QueueSender<T>,
        mut make: F,
    ) -> Result<Self, SchedulerError>
    where
        T: Send + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }

        let (stop, stopped) = mpsc::channel::<()>();
        let worker = thread::spawn(move || loop {
            match stopped.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {
                    if queue.send(make()).is_err() {
                        break;
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        debug!(?period, "background timer started");

        Ok(Self {
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the worker even if it is between sends.
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("background timer thread panicked");
            } else {
                debug!("background timer stopped");
            }
        }
    }

    /// Reports whether the thread has not been stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for BackgroundTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
