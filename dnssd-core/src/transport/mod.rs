//! The seam between a session and the daemon.
//!
//! A [`Transport`] moves whole [`Frame`]s. It exposes a [`Descriptor`]
//! so a reactor can key readiness registrations on it, a waiting read
//! for the blocking processing mode and a single-poll read for the
//! non-blocking one.

mod framed;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::Poll;

use async_trait::async_trait;

use crate::error::DnssdError;
use crate::frame::Frame;

#[cfg(unix)]
pub use framed::connect_unix;
pub use framed::{FramedTransport, memory_pair};

/// Opaque, process-unique handle naming one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Descriptor(u64);

impl Descriptor {
    /// Allocate a fresh descriptor.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A framed, bidirectional link to the daemon.
#[async_trait]
pub trait Transport: Send {
    fn descriptor(&self) -> Descriptor;

    /// Wait for the next frame. `Ok(None)` means the peer closed the link.
    async fn read_frame(&mut self) -> Result<Option<Frame>, DnssdError>;

    /// Return a frame only if one can be produced without waiting.
    fn try_read_frame(&mut self) -> Poll<Result<Option<Frame>, DnssdError>>;

    async fn write_frame(&mut self, frame: Frame) -> Result<(), DnssdError>;

    /// Release the underlying stream. Later reads report end of stream.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn descriptor(&self) -> Descriptor {
        (**self).descriptor()
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>, DnssdError> {
        (**self).read_frame().await
    }

    fn try_read_frame(&mut self) -> Poll<Result<Option<Frame>, DnssdError>> {
        (**self).try_read_frame()
    }

    async fn write_frame(&mut self, frame: Frame) -> Result<(), DnssdError> {
        (**self).write_frame(frame).await
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
