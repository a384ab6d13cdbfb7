//! Reply payloads (daemon → client) and their decoding per session kind.

use std::net::Ipv4Addr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::DnssdError;
use crate::flags::{PortMappingProtocol, ServiceFlags};
use crate::frame::Frame;
use crate::op::OperationKind;
use crate::session::RecordId;
use crate::txt::{ParseMode, ParsedTxtRecord};

/// A domain reported by an enumerate-domains session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainReply {
    /// `ADD` (otherwise removed) and `DEFAULT`.
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    pub domain: String,
}

/// An instance appearing or disappearing during a browse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrowseReply {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    pub name: String,
    pub regtype: String,
    pub domain: String,
}

impl BrowseReply {
    pub fn is_add(&self) -> bool {
        self.flags.is_add()
    }
}

/// Wire form of a resolve answer; the TXT rdata is still raw.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvePayload {
    pub interface: u32,
    pub fullname: String,
    pub host: String,
    pub port: u16,
    pub txt: Vec<u8>,
}

/// A resolved instance with its TXT record decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveReply {
    pub flags: ServiceFlags,
    pub interface: u32,
    pub fullname: String,
    pub host: String,
    pub port: u16,
    pub txt: ParsedTxtRecord,
}

/// One resource record answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryReply {
    /// `ADD` absent means the record went away.
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    pub fullname: String,
    pub rrtype: u16,
    pub rrclass: u16,
    pub rdata: Vec<u8>,
    pub ttl: u32,
}

/// The name a service was registered (or deregistered) under.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterReply {
    /// `ADD` on success, absent when a conflict forced deregistration.
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub name: String,
    pub regtype: String,
    pub domain: String,
}

/// Daemon confirmation of an individually registered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordReply {
    pub flags: ServiceFlags,
    pub record: RecordId,
}

/// Current state of a NAT port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMappingReply {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    /// `0.0.0.0` when no mapping could be obtained.
    pub external_address: Ipv4Addr,
    pub protocol: u32,
    pub internal_port: u16,
    pub external_port: u16,
    pub ttl: u32,
}

impl PortMappingReply {
    pub fn protocol(&self) -> PortMappingProtocol {
        PortMappingProtocol::from_bits_truncate(self.protocol)
    }
}

impl Default for PortMappingReply {
    fn default() -> Self {
        Self {
            flags: ServiceFlags::empty(),
            interface: 0,
            external_address: Ipv4Addr::UNSPECIFIED,
            protocol: 0,
            internal_port: 0,
            external_port: 0,
            ttl: 0,
        }
    }
}

// ── Reply ────────────────────────────────────────────────────────

/// A fully decoded reply handed to a session callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Domain(DomainReply),
    Browse(BrowseReply),
    Resolve(ResolveReply),
    Query(QueryReply),
    Registered(RegisterReply),
    Record(RecordReply),
    PortMapping(PortMappingReply),
}

impl Reply {
    /// Decode `frame` as a reply for a session of `kind`.
    ///
    /// The frame must carry the kind's reply op, a valid checksum and a
    /// well-formed payload. TXT rdata in resolve answers is parsed
    /// strictly.
    pub fn decode(kind: OperationKind, frame: &Frame) -> Result<Self, DnssdError> {
        if frame.op() != kind.reply_op() {
            return Err(DnssdError::ProtocolViolation(
                "reply op does not match session kind",
            ));
        }
        let flags = frame.flags();

        let reply = match kind {
            OperationKind::EnumerateDomains => Reply::Domain(DomainReply {
                flags,
                ..frame.decode()?
            }),
            OperationKind::Browse => Reply::Browse(BrowseReply {
                flags,
                ..frame.decode()?
            }),
            OperationKind::Resolve => {
                let payload: ResolvePayload = frame.decode()?;
                let txt = ParsedTxtRecord::parse_with(Bytes::from(payload.txt), ParseMode::Strict)?;
                Reply::Resolve(ResolveReply {
                    flags,
                    interface: payload.interface,
                    fullname: payload.fullname,
                    host: payload.host,
                    port: payload.port,
                    txt,
                })
            }
            OperationKind::QueryRecord => Reply::Query(QueryReply {
                flags,
                ..frame.decode()?
            }),
            OperationKind::RegisterService => Reply::Registered(RegisterReply {
                flags,
                ..frame.decode()?
            }),
            OperationKind::CreateConnection => {
                frame.validate()?;
                Reply::Record(RecordReply {
                    flags,
                    record: RecordId(frame.reg_index()),
                })
            }
            OperationKind::PortMapping => Reply::PortMapping(PortMappingReply {
                flags,
                ..frame.decode()?
            }),
        };
        Ok(reply)
    }

    pub fn flags(&self) -> ServiceFlags {
        match self {
            Reply::Domain(r) => r.flags,
            Reply::Browse(r) => r.flags,
            Reply::Resolve(r) => r.flags,
            Reply::Query(r) => r.flags,
            Reply::Registered(r) => r.flags,
            Reply::Record(r) => r.flags,
            Reply::PortMapping(r) => r.flags,
        }
    }
}
