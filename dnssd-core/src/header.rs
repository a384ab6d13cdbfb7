use crate::error::DnssdError;
use crate::flags::ServiceFlags;
use crate::op::Op;

/// Size of an encoded [`FrameHeader`] on the wire.
pub const HEADER_SIZE: usize = 28;

/// Protocol version written into every header.
pub const PROTOCOL_VERSION: u16 = 1;

const MAGIC: [u8; 4] = *b"DSD1";

pub type FrameHeaderBytes = [u8; HEADER_SIZE];

/// Fixed-size header preceding every IPC payload.
///
/// ```text
/// magic        u32  (4)   "DSD1"
/// version      u16  (2)
/// op           u16  (2)
/// flags        u32  (4)
/// error        i32  (4)
/// reg_index    u32  (4)
/// payload_len  u32  (4)
/// checksum     u32  (4)
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    op: Op,
    flags: ServiceFlags,
    error: i32,
    reg_index: u32,
    payload_length: u32,
    checksum: u32,
}

impl FrameHeader {
    pub fn new(op: Op, flags: ServiceFlags, error: i32, reg_index: u32) -> Self {
        Self {
            op,
            flags,
            error,
            reg_index,
            payload_length: 0,
            checksum: 0,
        }
    }

    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut buf: FrameHeaderBytes = [0; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        buf[6..8].copy_from_slice(&(self.op as u16).to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.error.to_le_bytes());
        buf[16..20].copy_from_slice(&self.reg_index.to_le_bytes());
        buf[20..24].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[24..28].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &FrameHeaderBytes) -> Result<Self, DnssdError> {
        if bytes[0..4] != MAGIC {
            return Err(DnssdError::InvalidMagic);
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != PROTOCOL_VERSION {
            return Err(DnssdError::UnsupportedVersion(version));
        }
        let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];

        Ok(Self {
            op: Op::try_from(u16::from_le_bytes([bytes[6], bytes[7]]))?,
            flags: ServiceFlags::from_bits_truncate(u32::from_le_bytes(word(8))),
            error: i32::from_le_bytes(word(12)),
            reg_index: u32::from_le_bytes(word(16)),
            payload_length: u32::from_le_bytes(word(20)),
            checksum: u32::from_le_bytes(word(24)),
        })
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn flags(&self) -> ServiceFlags {
        self.flags
    }

    pub fn error(&self) -> i32 {
        self.error
    }

    pub fn reg_index(&self) -> u32 {
        self.reg_index
    }

    pub fn payload_length(&self) -> u32 {
        self.payload_length
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub(crate) fn set_payload(&mut self, length: u32, checksum: u32) {
        self.payload_length = length;
        self.checksum = checksum;
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("op", &self.op)
            .field("flags", &self.flags)
            .field("error", &self.error)
            .field("reg_index", &self.reg_index)
            .field("payload_length", &self.payload_length)
            .field("checksum", &format_args!("{:#010x}", self.checksum))
            .finish()
    }
}
