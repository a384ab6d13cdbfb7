use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DnssdError;
use crate::flags::ServiceFlags;
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::op::Op;

/// Largest payload a frame may carry.
pub const MAX_PAYLOAD_SIZE: usize = 128 * 1024;
/// Largest encoded frame, header included.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// One IPC message: a [`FrameHeader`] plus its payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes,
}

impl Frame {
    /// Build a client → daemon request with a bincode payload.
    pub fn request<T: Serialize>(
        op: Op,
        flags: ServiceFlags,
        reg_index: u32,
        body: &T,
    ) -> Result<Self, DnssdError> {
        debug_assert!(!op.is_reply(), "{op} is not a request op");
        Self::encode(op, flags, reg_index, body)
    }

    /// Build a daemon → client reply with a bincode payload.
    pub fn reply<T: Serialize>(
        op: Op,
        flags: ServiceFlags,
        reg_index: u32,
        body: &T,
    ) -> Result<Self, DnssdError> {
        debug_assert!(op.is_reply(), "{op} is not a reply op");
        Self::encode(op, flags, reg_index, body)
    }

    fn encode<T: Serialize>(
        op: Op,
        flags: ServiceFlags,
        reg_index: u32,
        body: &T,
    ) -> Result<Self, DnssdError> {
        let payload = bincode::serialize(body)?;
        Self::from_parts(FrameHeader::new(op, flags, 0, reg_index), payload.into())
    }

    /// Build a payload-less frame reporting `error` for `op`.
    pub fn error(op: Op, flags: ServiceFlags, reg_index: u32, error: i32) -> Self {
        Self {
            header: FrameHeader::new(op, flags, error, reg_index),
            payload: Bytes::new(),
        }
    }

    /// Accept (`error == 0`) or reject a start request.
    pub fn ack(error: i32) -> Self {
        Self::error(Op::Ack, ServiceFlags::empty(), 0, error)
    }

    /// Attach `payload` to `header`, filling in length and checksum.
    pub fn from_parts(mut header: FrameHeader, payload: Bytes) -> Result<Self, DnssdError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(DnssdError::FrameTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        header.set_payload(payload.len() as u32, checksum(&payload));
        Ok(Self { header, payload })
    }

    /// Reassemble a received frame without recomputing its checksum.
    pub(crate) fn from_wire(header: FrameHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn op(&self) -> Op {
        self.header.op()
    }

    pub fn flags(&self) -> ServiceFlags {
        self.header.flags()
    }

    pub fn reg_index(&self) -> u32 {
        self.header.reg_index()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Verify the payload against the header checksum.
    pub fn validate(&self) -> Result<(), DnssdError> {
        if checksum(&self.payload) != self.header.checksum() {
            return Err(DnssdError::ChecksumMismatch);
        }
        Ok(())
    }

    /// Checksum-verify and bincode-decode the payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DnssdError> {
        self.validate()?;
        Ok(bincode::deserialize(&self.payload)?)
    }
}

/// First four bytes of the payload's blake3 hash; zero for empty payloads.
fn checksum(payload: &[u8]) -> u32 {
    if payload.is_empty() {
        return 0;
    }
    let hash = blake3::hash(payload);
    let b = hash.as_bytes();
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("header", &self.header)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
