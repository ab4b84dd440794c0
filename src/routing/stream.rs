//! Input and output boundaries of the router.
//!
//! Routes read raw messages from an [`InputStream`] and write decoded ones
//! to a [`SharedOutput`]. Device-backed implementations live in
//! [`crate::midi`]; the queue and memory versions here serve tests and
//! in-process wiring.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::midi::MidiMessage;

/// A blocking source of raw MIDI messages.
pub trait InputStream: Send {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Wait up to `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time. An error means the stream
    /// is gone and will not produce anything else.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;
}

/// A destination for outgoing messages.
pub trait OutputSink: Send {
    fn send(&mut self, msg: &MidiMessage) -> Result<()>;
}

/// An output sink shared by several routes. Writes are serialized.
#[derive(Clone)]
pub struct SharedOutput {
    inner: Arc<Mutex<Box<dyn OutputSink>>>,
}

impl SharedOutput {
    pub fn new<S: OutputSink + 'static>(sink: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    pub fn send(&self, msg: &MidiMessage) -> Result<()> {
        self.inner.lock().send(msg)
    }
}

/// Input fed through an in-process channel.
pub struct QueueInput {
    name: String,
    receiver: Receiver<Vec<u8>>,
}

impl QueueInput {
    /// Create a queue and the sender that feeds it. Dropping every sender
    /// ends the stream.
    pub fn new(name: impl Into<String>) -> (Sender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                name: name.into(),
                receiver,
            },
        )
    }

    pub(crate) fn from_receiver(name: impl Into<String>, receiver: Receiver<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            receiver,
        }
    }
}

impl InputStream for QueueInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Disconnected(self.name.clone())),
        }
    }
}

/// Sink that keeps everything it is sent.
#[derive(Clone, Default)]
pub struct MemorySink {
    sent: Arc<Mutex<Vec<MidiMessage>>>,
    broken: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every write fails, as if the device went away.
    pub fn broken() -> Self {
        Self {
            sent: Arc::default(),
            broken: true,
        }
    }

    /// Messages received so far, in order.
    pub fn messages(&self) -> Vec<MidiMessage> {
        self.sent.lock().clone()
    }
}

impl OutputSink for MemorySink {
    fn send(&mut self, msg: &MidiMessage) -> Result<()> {
        if self.broken {
            return Err(Error::Device("output unavailable".to_string()));
        }
        self.sent.lock().push(msg.clone());
        Ok(())
    }
}
