//! Domain-specific error types for the DNS-SD client core.
//!
//! Three layers:
//! - [`TxtError`]: local, synchronous TXT record codec failures.
//! - [`ServiceError`]: error codes reported by the discovery daemon.
//! - [`DnssdError`]: the crate-wide error that wraps both plus
//!   framing, transport and session-state failures.
//!
//! No panics on invalid input; every error is typed and recoverable.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::session::RecordId;

/// The canonical error type for the crate.
#[derive(Debug, Error)]
pub enum DnssdError {
    // ── Codec / daemon ───────────────────────────────────────────
    /// A TXT record operation failed.
    #[error("txt record: {0}")]
    Txt(#[from] TxtError),

    /// The daemon rejected or failed an operation.
    #[error("daemon error: {0}")]
    Service(#[from] ServiceError),

    /// The daemon rejected one sub-registration. The session no longer
    /// tracks the record.
    #[error("record {record} rejected: {error}")]
    Record { record: RecordId, error: ServiceError },

    // ── Session state ────────────────────────────────────────────
    /// The operation is not valid in the session's current phase.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    // ── Framing ──────────────────────────────────────────────────
    /// Received bytes that do not start with the frame magic.
    #[error("invalid magic bytes: expected DSD1")]
    InvalidMagic,

    /// The peer speaks a protocol version we do not understand.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    /// A frame announced a payload larger than the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The frame payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A frame violated protocol rules (e.g. a reply op the session
    /// kind never receives).
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Connection ───────────────────────────────────────────────
    /// The socket / IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl DnssdError {
    /// The daemon error code carried by this error, if any.
    pub fn service_error(&self) -> Option<ServiceError> {
        match self {
            DnssdError::Service(e) | DnssdError::Record { error: e, .. } => Some(*e),
            _ => None,
        }
    }

    /// The sub-registration a daemon rejection refers to.
    pub fn rejected_record(&self) -> Option<RecordId> {
        match self {
            DnssdError::Record { record, .. } => Some(*record),
            _ => None,
        }
    }
}

impl From<Box<bincode::ErrorKind>> for DnssdError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        DnssdError::Encoding(e.to_string())
    }
}

// ── TxtError ──────────────────────────────────────────────────────

/// Failures of the TXT record codec. Always synchronous and local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TxtError {
    /// Key is empty, contains `=`, non-printable ASCII, or is longer
    /// than a length byte can describe.
    #[error("invalid key")]
    InvalidKey,

    /// The encoded entry would exceed 255 bytes.
    #[error("entry too large: {0} bytes (max 255)")]
    EntryTooLarge(usize),

    /// A fixed-capacity record (or the 16-bit rdata limit) is exhausted.
    #[error("out of space: need {needed} bytes, capacity {capacity}")]
    OutOfSpace { needed: usize, capacity: usize },

    /// The key is not present in the record.
    #[error("no such key")]
    NoSuchKey,

    /// A length byte claims more bytes than remain in the input.
    #[error("truncated at offset {offset}: entry claims {claimed} bytes, {remaining} remain")]
    Truncated {
        offset: usize,
        claimed: usize,
        remaining: usize,
    },

    /// `entry_at` was called with an index past the last entry.
    #[error("index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },
}

// ── ServiceError ─────────────────────────────────────────────────

/// Error codes reported by the discovery daemon.
///
/// Discriminants are the wire values carried in the frame header.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ServiceError {
    Unknown = -65537,
    NoSuchName = -65538,
    NoMemory = -65539,
    BadParam = -65540,
    BadReference = -65541,
    BadState = -65542,
    BadFlags = -65543,
    Unsupported = -65544,
    NotInitialized = -65545,
    AlreadyRegistered = -65547,
    NameConflict = -65548,
    Invalid = -65549,
    Firewall = -65550,
    Incompatible = -65551,
    BadInterfaceIndex = -65552,
    Refused = -65553,
    NoSuchRecord = -65554,
    NoAuth = -65555,
    NoSuchKey = -65556,
    NatTraversal = -65557,
    DoubleNat = -65558,
    BadTime = -65559,
    BadSig = -65560,
    BadKey = -65561,
    Transient = -65562,
    ServiceNotRunning = -65563,
    NatPortMappingUnsupported = -65564,
    NatPortMappingDisabled = -65565,
    NoRouter = -65566,
    PollingMode = -65567,
    Timeout = -65568,
}

impl ServiceError {
    /// Wire value of this error.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map a header error field to a result: `0` is success.
    pub fn check(code: i32) -> Result<(), ServiceError> {
        if code == 0 {
            return Ok(());
        }
        Err(ServiceError::try_from(code).unwrap_or(ServiceError::Unknown))
    }
}

impl TryFrom<i32> for ServiceError {
    type Error = DnssdError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use ServiceError::*;
        let e = match value {
            -65537 => Unknown,
            -65538 => NoSuchName,
            -65539 => NoMemory,
            -65540 => BadParam,
            -65541 => BadReference,
            -65542 => BadState,
            -65543 => BadFlags,
            -65544 => Unsupported,
            -65545 => NotInitialized,
            -65547 => AlreadyRegistered,
            -65548 => NameConflict,
            -65549 => Invalid,
            -65550 => Firewall,
            -65551 => Incompatible,
            -65552 => BadInterfaceIndex,
            -65553 => Refused,
            -65554 => NoSuchRecord,
            -65555 => NoAuth,
            -65556 => NoSuchKey,
            -65557 => NatTraversal,
            -65558 => DoubleNat,
            -65559 => BadTime,
            -65560 => BadSig,
            -65561 => BadKey,
            -65562 => Transient,
            -65563 => ServiceNotRunning,
            -65564 => NatPortMappingUnsupported,
            -65565 => NatPortMappingDisabled,
            -65566 => NoRouter,
            -65567 => PollingMode,
            -65568 => Timeout,
            _ => {
                return Err(DnssdError::UnknownVariant {
                    type_name: "ServiceError",
                    value: value as u32 as u64,
                });
            }
        };
        Ok(e)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = DnssdError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = DnssdError::from(TxtError::EntryTooLarge(256));
        assert!(e.to_string().contains("256"));
    }

    #[test]
    fn service_error_codes_roundtrip() {
        for e in [
            ServiceError::Unknown,
            ServiceError::BadParam,
            ServiceError::NameConflict,
            ServiceError::ServiceNotRunning,
            ServiceError::Timeout,
        ] {
            assert_eq!(ServiceError::try_from(e.code()).unwrap(), e);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(ServiceError::try_from(-65546).is_err());
        assert!(ServiceError::try_from(42).is_err());
    }

    #[test]
    fn check_maps_zero_to_ok() {
        assert!(ServiceError::check(0).is_ok());
        assert_eq!(
            ServiceError::check(-65548).unwrap_err(),
            ServiceError::NameConflict
        );
        assert_eq!(ServiceError::check(7).unwrap_err(), ServiceError::Unknown);
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: DnssdError = io_err.into();
        assert!(matches!(e, DnssdError::Connection(_)));
        assert_eq!(e.service_error(), None);
    }

    #[test]
    fn record_rejection_names_the_record() {
        let e = DnssdError::Record {
            record: RecordId(3),
            error: ServiceError::NameConflict,
        };
        assert_eq!(e.rejected_record(), Some(RecordId(3)));
        assert_eq!(e.service_error(), Some(ServiceError::NameConflict));
        assert!(e.to_string().contains("#3"));
        assert_eq!(DnssdError::from(ServiceError::BadParam).rejected_record(), None);
    }
}
