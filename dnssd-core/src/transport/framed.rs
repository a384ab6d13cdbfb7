use std::task::Poll;

use async_trait::async_trait;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio_util::codec::Framed;

use super::{Descriptor, Transport};
use crate::codec::FrameCodec;
use crate::error::DnssdError;
use crate::frame::Frame;

/// [`Transport`] over any byte stream, framed with [`FrameCodec`].
pub struct FramedTransport<S> {
    descriptor: Descriptor,
    inner: Option<Framed<S, FrameCodec>>,
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            descriptor: Descriptor::next(),
            inner: Some(Framed::new(stream, FrameCodec)),
        }
    }

    /// The underlying stream, while the transport is open.
    pub fn get_ref(&self) -> Option<&S> {
        self.inner.as_ref().map(Framed::get_ref)
    }
}

#[async_trait]
impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>, DnssdError> {
        let Some(framed) = self.inner.as_mut() else {
            return Ok(None);
        };
        framed.next().await.transpose()
    }

    fn try_read_frame(&mut self) -> Poll<Result<Option<Frame>, DnssdError>> {
        let Some(framed) = self.inner.as_mut() else {
            return Poll::Ready(Ok(None));
        };
        match framed.next().now_or_never() {
            Some(next) => Poll::Ready(next.transpose()),
            None => Poll::Pending,
        }
    }

    async fn write_frame(&mut self, frame: Frame) -> Result<(), DnssdError> {
        let framed = self.inner.as_mut().ok_or(DnssdError::InvalidState(
            "transport closed",
        ))?;
        tracing::debug!(descriptor = %self.descriptor, op = %frame.op(), "send frame");
        framed.send(frame).await
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!(descriptor = %self.descriptor, "transport closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for FramedTransport<tokio::net::UnixStream> {
    /// The socket's file descriptor, or `-1` once closed.
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.get_ref().map_or(-1, |s| s.as_raw_fd())
    }
}

/// Open a transport to the daemon's Unix domain socket.
#[cfg(unix)]
pub async fn connect_unix(
    path: &std::path::Path,
) -> Result<FramedTransport<tokio::net::UnixStream>, DnssdError> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    Ok(FramedTransport::new(stream))
}

/// An in-memory transport and the daemon-side end of the same pipe.
///
/// Useful for driving sessions without a daemon.
pub fn memory_pair(
    buffer: usize,
) -> (
    FramedTransport<DuplexStream>,
    Framed<DuplexStream, FrameCodec>,
) {
    let (client, daemon) = tokio::io::duplex(buffer);
    (FramedTransport::new(client), Framed::new(daemon, FrameCodec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::ServiceFlags;
    use crate::op::Op;

    #[tokio::test]
    async fn frames_cross_the_pipe() {
        let (mut client, mut daemon) = memory_pair(4096);

        client
            .write_frame(Frame::request(Op::Browse, ServiceFlags::empty(), 0, &"x").unwrap())
            .await
            .unwrap();
        let got = daemon.next().await.unwrap().unwrap();
        assert_eq!(got.op(), Op::Browse);

        daemon.send(Frame::ack(0)).await.unwrap();
        let ack = client.read_frame().await.unwrap().unwrap();
        assert_eq!(ack.op(), Op::Ack);
    }

    #[tokio::test]
    async fn try_read_does_not_wait() {
        let (mut client, mut daemon) = memory_pair(4096);
        tokio_test::assert_pending!(client.try_read_frame());

        daemon.send(Frame::ack(0)).await.unwrap();
        let frame = tokio_test::assert_ready_ok!(client.try_read_frame());
        assert_eq!(frame.map(|f| f.op()), Some(Op::Ack));
    }

    #[tokio::test]
    async fn peer_close_reads_as_none() {
        let (mut client, daemon) = memory_pair(4096);
        drop(daemon);
        assert!(client.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_transport_refuses_writes() {
        let (mut client, _daemon) = memory_pair(4096);
        client.close();
        assert!(client.is_closed());
        assert!(client.read_frame().await.unwrap().is_none());
        assert!(matches!(
            client.write_frame(Frame::ack(0)).await,
            Err(DnssdError::InvalidState(_))
        ));
    }

    #[test]
    fn descriptors_are_unique() {
        assert_ne!(Descriptor::next(), Descriptor::next());
    }
}
