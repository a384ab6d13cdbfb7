//! Operation codes and session kinds.
//!
//! Wire values convert with `TryFrom`; unknown values are errors, never panics.

use std::fmt;

use crate::error::DnssdError;
use crate::flags::ServiceFlags;

// ── Op ───────────────────────────────────────────────────────────

/// Operation code carried in every frame header.
///
/// - `1..=14`:  requests (client → daemon)
/// - `64..=71`: replies (daemon → client)
/// - `96`:      synchronous accept/reject of a start request
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // ── Requests ─────────────────────────────────────────────────
    /// Open a connection that carries individually registered records.
    Connection = 1,
    /// Register one record on a connection session.
    RegisterRecord = 2,
    /// Remove a sub-registration.
    RemoveRecord = 3,
    /// Enumerate browse or registration domains.
    EnumerateDomains = 4,
    /// Register a service instance.
    RegisterService = 5,
    /// Browse for instances of a service type.
    Browse = 6,
    /// Resolve an instance to host, port and TXT.
    Resolve = 7,
    /// Query an arbitrary resource record.
    Query = 8,
    /// Ask the daemon to re-verify a cached record.
    ReconfirmRecord = 9,
    /// Add an extra record to a registered service.
    AddRecord = 10,
    /// Update a record (or the primary TXT record).
    UpdateRecord = 11,
    /// Request a NAT port mapping.
    PortMapping = 14,

    // ── Replies ──────────────────────────────────────────────────
    EnumerationReply = 64,
    RegisterServiceReply = 65,
    BrowseReply = 66,
    ResolveReply = 67,
    QueryReply = 68,
    RegisterRecordReply = 69,
    PortMappingReply = 71,

    /// Daemon's answer to a start request; the header `error` field
    /// carries the verdict.
    Ack = 96,
}

impl TryFrom<u16> for Op {
    type Error = DnssdError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Op::Connection),
            2 => Ok(Op::RegisterRecord),
            3 => Ok(Op::RemoveRecord),
            4 => Ok(Op::EnumerateDomains),
            5 => Ok(Op::RegisterService),
            6 => Ok(Op::Browse),
            7 => Ok(Op::Resolve),
            8 => Ok(Op::Query),
            9 => Ok(Op::ReconfirmRecord),
            10 => Ok(Op::AddRecord),
            11 => Ok(Op::UpdateRecord),
            14 => Ok(Op::PortMapping),

            64 => Ok(Op::EnumerationReply),
            65 => Ok(Op::RegisterServiceReply),
            66 => Ok(Op::BrowseReply),
            67 => Ok(Op::ResolveReply),
            68 => Ok(Op::QueryReply),
            69 => Ok(Op::RegisterRecordReply),
            71 => Ok(Op::PortMappingReply),

            96 => Ok(Op::Ack),

            _ => Err(DnssdError::UnknownVariant {
                type_name: "Op",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Op {
    /// Returns `true` for ops the daemon sends.
    pub fn is_reply(&self) -> bool {
        (*self as u16) >= 64
    }
}

// ── OperationKind ────────────────────────────────────────────────

/// The kind of operation a session was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    EnumerateDomains,
    Browse,
    Resolve,
    QueryRecord,
    RegisterService,
    /// A connection that carries records registered one by one.
    CreateConnection,
    PortMapping,
}

impl OperationKind {
    /// Request op that starts a session of this kind.
    pub fn request_op(&self) -> Op {
        match self {
            OperationKind::EnumerateDomains => Op::EnumerateDomains,
            OperationKind::Browse => Op::Browse,
            OperationKind::Resolve => Op::Resolve,
            OperationKind::QueryRecord => Op::Query,
            OperationKind::RegisterService => Op::RegisterService,
            OperationKind::CreateConnection => Op::Connection,
            OperationKind::PortMapping => Op::PortMapping,
        }
    }

    /// The only reply op a session of this kind accepts.
    pub fn reply_op(&self) -> Op {
        match self {
            OperationKind::EnumerateDomains => Op::EnumerationReply,
            OperationKind::Browse => Op::BrowseReply,
            OperationKind::Resolve => Op::ResolveReply,
            OperationKind::QueryRecord => Op::QueryReply,
            OperationKind::RegisterService => Op::RegisterServiceReply,
            OperationKind::CreateConnection => Op::RegisterRecordReply,
            OperationKind::PortMapping => Op::PortMappingReply,
        }
    }

    /// Kinds expected to deliver one final answer. A daemon-side
    /// rejection terminates these sessions.
    pub fn is_one_shot(&self, flags: ServiceFlags) -> bool {
        match self {
            OperationKind::Resolve => true,
            OperationKind::QueryRecord => !flags.contains(ServiceFlags::LONG_LIVED_QUERY),
            _ => false,
        }
    }

    /// Whether the session may be started without a callback.
    pub fn callback_optional(&self) -> bool {
        matches!(
            self,
            OperationKind::RegisterService | OperationKind::CreateConnection
        )
    }

    /// Whether the session owns sub-registrations.
    pub fn owns_records(&self) -> bool {
        self.callback_optional()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::EnumerateDomains => "enumerate-domains",
            OperationKind::Browse => "browse",
            OperationKind::Resolve => "resolve",
            OperationKind::QueryRecord => "query-record",
            OperationKind::RegisterService => "register-service",
            OperationKind::CreateConnection => "create-connection",
            OperationKind::PortMapping => "nat-port-mapping",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_roundtrip() {
        let ops = [
            Op::Connection,
            Op::RegisterRecord,
            Op::RemoveRecord,
            Op::EnumerateDomains,
            Op::RegisterService,
            Op::Browse,
            Op::Resolve,
            Op::Query,
            Op::ReconfirmRecord,
            Op::AddRecord,
            Op::UpdateRecord,
            Op::PortMapping,
            Op::EnumerationReply,
            Op::RegisterServiceReply,
            Op::BrowseReply,
            Op::ResolveReply,
            Op::QueryReply,
            Op::RegisterRecordReply,
            Op::PortMappingReply,
            Op::Ack,
        ];
        for op in ops {
            assert_eq!(Op::try_from(op as u16).unwrap(), op);
        }
    }

    #[test]
    fn op_invalid() {
        assert!(Op::try_from(12).is_err());
        assert!(Op::try_from(0xDEAD).is_err());
    }

    #[test]
    fn reply_ops_are_replies() {
        assert!(Op::BrowseReply.is_reply());
        assert!(Op::Ack.is_reply());
        assert!(!Op::Browse.is_reply());
        assert!(!Op::ReconfirmRecord.is_reply());
    }

    #[test]
    fn one_shot_kinds() {
        assert!(OperationKind::Resolve.is_one_shot(ServiceFlags::empty()));
        assert!(OperationKind::QueryRecord.is_one_shot(ServiceFlags::empty()));
        assert!(!OperationKind::QueryRecord.is_one_shot(ServiceFlags::LONG_LIVED_QUERY));
        assert!(!OperationKind::Browse.is_one_shot(ServiceFlags::empty()));
        assert!(!OperationKind::PortMapping.is_one_shot(ServiceFlags::empty()));
    }

    #[test]
    fn callback_rules() {
        assert!(OperationKind::RegisterService.callback_optional());
        assert!(!OperationKind::Browse.callback_optional());
    }
}
