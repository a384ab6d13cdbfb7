//! # dnssd-core
//!
//! Client core for DNS Service Discovery.
//!
//! This crate contains:
//! - **TXT codec**: `TxtRecord` builder and zero-copy `ParsedTxtRecord` reader
//!   for the RFC 6763 §6 key/value format
//! - **Frames**: `FrameHeader`, `Frame` and `FrameCodec` for the daemon IPC
//!   protocol, framed via `tokio_util`
//! - **Protocol payloads**: request and reply types for every session kind
//! - **Transport**: the `Transport` seam, Unix socket and in-memory links
//! - **Session**: `Session`, one discovery or registration operation with
//!   its callback and sub-registrations
//! - **Reactor**: `Reactor`, drives sessions on tokio tasks with deadlines
//! - **Client**: `DaemonClient`, connects sessions to the local daemon
//! - **Error**: `DnssdError`, `TxtError`, `ServiceError`, built on `thiserror`

pub mod codec;
pub mod config;
pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod names;
pub mod op;
pub mod protocol;
pub mod reactor;
pub mod session;
pub mod transport;
pub mod txt;

#[cfg(unix)]
pub mod client;

// ── Re-exports for ergonomic usage ───────────────────────────────

#[cfg(unix)]
pub use client::DaemonClient;
pub use codec::FrameCodec;
pub use config::ClientConfig;
pub use error::{DnssdError, ServiceError, TxtError};
pub use flags::{PortMappingProtocol, ServiceFlags};
pub use frame::{Frame, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use header::{FrameHeader, HEADER_SIZE};
pub use names::construct_full_name;
pub use op::{Op, OperationKind};
pub use protocol::{Reply, Request};
pub use reactor::{Reactor, ReactorEvent, ReactorEvents};
pub use session::{
    RecordId, RecordRef, ReplyCallback, Session, SessionPhase, reconfirm_record,
};
pub use transport::{Descriptor, FramedTransport, Transport, memory_pair};
pub use txt::{Growth, ParseMode, ParsedTxtRecord, TxtEntry, TxtRecord};
