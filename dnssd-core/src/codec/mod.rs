//! Length-framed codec for IPC frames, used through `tokio_util::codec::Framed`.
//!
//! Header problems (magic, version, unknown op, oversize) are returned as
//! errors and end the stream: there is no way to resynchronise. Payload
//! integrity is left to [`Frame::validate`] so that one corrupt reply does
//! not take the whole session down.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::DnssdError;
use crate::frame::{Frame, MAX_PAYLOAD_SIZE};
use crate::header::{FrameHeader, FrameHeaderBytes, HEADER_SIZE};

#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = DnssdError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut raw: FrameHeaderBytes = [0; HEADER_SIZE];
        raw.copy_from_slice(&src[..HEADER_SIZE]);
        let header = FrameHeader::from_bytes(&raw)?;

        let payload_len = header.payload_length() as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(DnssdError::FrameTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if src.len() < HEADER_SIZE + payload_len {
            src.reserve(HEADER_SIZE + payload_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Frame::from_wire(header, payload)))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = DnssdError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(HEADER_SIZE + item.payload().len());
        dst.put_slice(&item.header().to_bytes());
        dst.put_slice(item.payload());
        Ok(())
    }
}
