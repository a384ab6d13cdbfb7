//! Request payloads (client → daemon).
//!
//! ```text
//! Client ──[op = kind request]──────────► Daemon
//!   Payload: one of the structs below (bincode)
//!
//! Daemon ──[Ack, error = 0 | code]──────► Client     (exactly once)
//!
//! Daemon ──[kind reply]─────────────────► Client     (zero or more)
//! ```
//!
//! Flags travel in the frame header, so they are skipped by serde.

use serde::{Deserialize, Serialize};

use crate::error::{DnssdError, ServiceError};
use crate::flags::{PortMappingProtocol, ServiceFlags};
use crate::frame::Frame;
use crate::names::{interface, validate_regtype, validate_service_name};
use crate::op::{Op, OperationKind};
use crate::txt::{MAX_RECORD_LEN, ParsedTxtRecord, TxtRecord};

// ── Enumerate domains ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumerateDomainsRequest {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
}

impl EnumerateDomainsRequest {
    /// Domains recommended for browsing.
    pub fn browse() -> Self {
        Self {
            flags: ServiceFlags::BROWSE_DOMAINS,
            interface: 0,
        }
    }

    /// Domains recommended for registration.
    pub fn registration() -> Self {
        Self {
            flags: ServiceFlags::REGISTRATION_DOMAINS,
            interface: 0,
        }
    }
}

// ── Browse ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrowseRequest {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    /// Service type, e.g. `_http._tcp` (optionally with `,subtype`).
    pub regtype: String,
    /// `None` browses the default domain(s).
    pub domain: Option<String>,
}

impl BrowseRequest {
    pub fn new(regtype: impl Into<String>) -> Self {
        Self {
            regtype: regtype.into(),
            ..Default::default()
        }
    }

    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

// ── Resolve ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolveRequest {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    /// Instance name as reported by a browse reply.
    pub name: String,
    pub regtype: String,
    pub domain: String,
}

impl ResolveRequest {
    pub fn new(
        name: impl Into<String>,
        regtype: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            regtype: regtype.into(),
            domain: domain.into(),
            ..Default::default()
        }
    }
}

// ── Query record ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    pub fullname: String,
    pub rrtype: u16,
    pub rrclass: u16,
}

impl QueryRequest {
    pub fn new(fullname: impl Into<String>, rrtype: u16) -> Self {
        Self {
            fullname: fullname.into(),
            rrtype,
            rrclass: super::rr::CLASS_IN,
            ..Default::default()
        }
    }

    /// Keep the query open for change notifications.
    pub fn long_lived(mut self) -> Self {
        self.flags |= ServiceFlags::LONG_LIVED_QUERY;
        self
    }
}

// ── Register service ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterServiceRequest {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    /// `None` lets the daemon pick the computer name.
    pub name: Option<String>,
    pub regtype: String,
    pub domain: Option<String>,
    /// SRV target; `None` uses the machine's host name.
    pub host: Option<String>,
    /// `0` registers a placeholder that is never discovered.
    pub port: u16,
    /// Encoded TXT rdata. Empty is sent as a single empty string.
    pub txt: Vec<u8>,
}

impl RegisterServiceRequest {
    pub fn new(regtype: impl Into<String>, port: u16) -> Self {
        Self {
            regtype: regtype.into(),
            port,
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_txt(mut self, txt: &TxtRecord) -> Self {
        self.txt = txt.serialize().to_vec();
        self
    }
}

// ── NAT port mapping ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortMappingRequest {
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    /// [`PortMappingProtocol`] bits; empty only discovers the external address.
    pub protocol: u32,
    pub internal_port: u16,
    /// `0` lets the gateway choose.
    pub external_port: u16,
    /// Requested lifetime in seconds; `0` uses the system default.
    pub ttl: u32,
}

impl PortMappingRequest {
    pub fn new(protocol: PortMappingProtocol, internal_port: u16) -> Self {
        Self {
            protocol: protocol.bits(),
            internal_port,
            ..Default::default()
        }
    }

    /// Only ask for the gateway's external address.
    pub fn external_address() -> Self {
        Self::default()
    }
}

// ── Sub-registrations ────────────────────────────────────────────

/// A record registered individually on a connection session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterRecordRequest {
    /// `SHARED` or `UNIQUE`.
    #[serde(skip)]
    pub flags: ServiceFlags,
    pub interface: u32,
    pub fullname: String,
    pub rrtype: u16,
    pub rrclass: u16,
    pub rdata: Vec<u8>,
    pub ttl: u32,
}

/// An extra record attached to a registered service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddRecordRequest {
    pub rrtype: u16,
    pub rdata: Vec<u8>,
    pub ttl: u32,
}

/// New rdata for a sub-registration or the primary TXT record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateRecordRequest {
    pub rdata: Vec<u8>,
    pub ttl: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoveRecordRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionRequest;

// ── Reconfirm ────────────────────────────────────────────────────

/// A cached record that looks stale (for example, its target stopped
/// answering). The daemon re-verifies it and flushes it network-wide if
/// it turns out to be gone.
///
/// Not a session: the daemon acknowledges the request and the
/// connection is closed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconfirmRecordRequest {
    #[serde(skip)]
    pub flags: ServiceFlags,
    /// Must name one interface; wildcard reconfirmation is refused.
    pub interface: u32,
    pub fullname: String,
    pub rrtype: u16,
    pub rrclass: u16,
    pub rdata: Vec<u8>,
}

impl ReconfirmRecordRequest {
    pub fn new(interface: u32, fullname: impl Into<String>, rrtype: u16, rdata: Vec<u8>) -> Self {
        Self {
            interface,
            fullname: fullname.into(),
            rrtype,
            rrclass: super::rr::CLASS_IN,
            rdata,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.interface == interface::ANY {
            return Err(ServiceError::BadInterfaceIndex);
        }
        if self.fullname.is_empty() || self.rdata.len() > MAX_RECORD_LEN {
            return Err(ServiceError::BadParam);
        }
        Ok(())
    }

    pub fn to_frame(&self) -> Result<Frame, DnssdError> {
        Frame::request(Op::ReconfirmRecord, self.flags, 0, self)
    }
}

// ── Request ──────────────────────────────────────────────────────

/// Everything needed to start one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    EnumerateDomains(EnumerateDomainsRequest),
    Browse(BrowseRequest),
    Resolve(ResolveRequest),
    QueryRecord(QueryRequest),
    RegisterService(RegisterServiceRequest),
    CreateConnection,
    PortMapping(PortMappingRequest),
}

impl Request {
    pub fn kind(&self) -> OperationKind {
        match self {
            Request::EnumerateDomains(_) => OperationKind::EnumerateDomains,
            Request::Browse(_) => OperationKind::Browse,
            Request::Resolve(_) => OperationKind::Resolve,
            Request::QueryRecord(_) => OperationKind::QueryRecord,
            Request::RegisterService(_) => OperationKind::RegisterService,
            Request::CreateConnection => OperationKind::CreateConnection,
            Request::PortMapping(_) => OperationKind::PortMapping,
        }
    }

    pub fn flags(&self) -> ServiceFlags {
        match self {
            Request::EnumerateDomains(r) => r.flags,
            Request::Browse(r) => r.flags,
            Request::Resolve(r) => r.flags,
            Request::QueryRecord(r) => r.flags,
            Request::RegisterService(r) => r.flags,
            Request::CreateConnection => ServiceFlags::empty(),
            Request::PortMapping(r) => r.flags,
        }
    }

    /// Local argument checks; failures never reach the daemon.
    pub fn validate(&self, has_callback: bool) -> Result<(), ServiceError> {
        if !has_callback && !self.kind().callback_optional() {
            return Err(ServiceError::BadParam);
        }
        match self {
            Request::EnumerateDomains(r) => {
                let wanted = ServiceFlags::BROWSE_DOMAINS | ServiceFlags::REGISTRATION_DOMAINS;
                if (r.flags & wanted).bits().count_ones() != 1 {
                    return Err(ServiceError::BadFlags);
                }
            }
            Request::Browse(r) => validate_regtype(&r.regtype)?,
            Request::Resolve(r) => {
                if r.name.is_empty() || r.domain.is_empty() {
                    return Err(ServiceError::BadParam);
                }
                validate_regtype(&r.regtype)?;
            }
            Request::QueryRecord(r) => {
                if r.fullname.is_empty() {
                    return Err(ServiceError::BadParam);
                }
            }
            Request::RegisterService(r) => {
                let no_auto_rename = r.flags.contains(ServiceFlags::NO_AUTO_RENAME);
                // a rename could not be reported without a callback
                if no_auto_rename && !has_callback {
                    return Err(ServiceError::BadParam);
                }
                if let Some(name) = &r.name {
                    validate_service_name(name, no_auto_rename)?;
                }
                validate_regtype(&r.regtype)?;
                if !r.txt.is_empty() && ParsedTxtRecord::parse(&r.txt).is_err() {
                    return Err(ServiceError::BadParam);
                }
            }
            Request::CreateConnection => {}
            Request::PortMapping(r) => {
                let protocol =
                    PortMappingProtocol::from_bits(r.protocol).ok_or(ServiceError::BadParam)?;
                let discovery_only = protocol.is_empty();
                if discovery_only && (r.internal_port != 0 || r.external_port != 0 || r.ttl != 0)
                {
                    return Err(ServiceError::BadParam);
                }
                if !discovery_only && r.internal_port == 0 {
                    return Err(ServiceError::BadParam);
                }
            }
        }
        Ok(())
    }

    /// Encode as the frame that starts the session.
    pub fn to_frame(&self) -> Result<Frame, DnssdError> {
        let op = self.kind().request_op();
        let flags = self.flags();
        match self {
            Request::EnumerateDomains(r) => Frame::request(op, flags, 0, r),
            Request::Browse(r) => Frame::request(op, flags, 0, r),
            Request::Resolve(r) => Frame::request(op, flags, 0, r),
            Request::QueryRecord(r) => Frame::request(op, flags, 0, r),
            Request::RegisterService(r) if r.txt.is_empty() => {
                let r = RegisterServiceRequest {
                    txt: vec![0],
                    ..r.clone()
                };
                Frame::request(op, flags, 0, &r)
            }
            Request::RegisterService(r) => Frame::request(op, flags, 0, r),
            Request::CreateConnection => Frame::request(Op::Connection, flags, 0, &ConnectionRequest),
            Request::PortMapping(r) => Frame::request(op, flags, 0, r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_required_for_browse() {
        let req = Request::Browse(BrowseRequest::new("_http._tcp"));
        assert_eq!(req.validate(false), Err(ServiceError::BadParam));
        assert!(req.validate(true).is_ok());
    }

    #[test]
    fn register_without_callback_cannot_forbid_rename() {
        let mut r = RegisterServiceRequest::new("_http._tcp", 80);
        assert!(Request::RegisterService(r.clone()).validate(false).is_ok());

        r.flags |= ServiceFlags::NO_AUTO_RENAME;
        assert_eq!(
            Request::RegisterService(r.clone()).validate(false),
            Err(ServiceError::BadParam)
        );
        assert!(Request::RegisterService(r).validate(true).is_ok());
    }

    #[test]
    fn register_rejects_malformed_txt() {
        let mut r = RegisterServiceRequest::new("_http._tcp", 80);
        r.txt = vec![0x05, b'a'];
        assert_eq!(
            Request::RegisterService(r).validate(true),
            Err(ServiceError::BadParam)
        );
    }

    #[test]
    fn empty_txt_is_sent_as_single_empty_string() {
        let req = Request::RegisterService(RegisterServiceRequest::new("_http._tcp", 80));
        let frame = req.to_frame().unwrap();
        let sent: RegisterServiceRequest = frame.decode().unwrap();
        assert_eq!(sent.txt, vec![0]);
        assert_eq!(frame.op(), Op::RegisterService);
    }

    #[test]
    fn enumerate_needs_exactly_one_domain_flag() {
        assert!(Request::EnumerateDomains(EnumerateDomainsRequest::browse())
            .validate(true)
            .is_ok());
        let mut both = EnumerateDomainsRequest::browse();
        both.flags |= ServiceFlags::REGISTRATION_DOMAINS;
        assert_eq!(
            Request::EnumerateDomains(both).validate(true),
            Err(ServiceError::BadFlags)
        );
        assert_eq!(
            Request::EnumerateDomains(EnumerateDomainsRequest::default()).validate(true),
            Err(ServiceError::BadFlags)
        );
    }

    #[test]
    fn port_mapping_rules() {
        let ok = PortMappingRequest::new(PortMappingProtocol::TCP, 8080);
        assert!(Request::PortMapping(ok).validate(true).is_ok());
        assert!(Request::PortMapping(PortMappingRequest::external_address())
            .validate(true)
            .is_ok());

        let no_port = PortMappingRequest::new(PortMappingProtocol::UDP, 0);
        assert!(Request::PortMapping(no_port).validate(true).is_err());

        let mut stray = PortMappingRequest::external_address();
        stray.ttl = 60;
        assert!(Request::PortMapping(stray).validate(true).is_err());

        let mut bogus = PortMappingRequest::new(PortMappingProtocol::TCP, 1);
        bogus.protocol = 0x1;
        assert!(Request::PortMapping(bogus).validate(true).is_err());
    }

    #[test]
    fn reconfirm_needs_an_interface() {
        let ok = ReconfirmRecordRequest::new(2, "Office._ipp._tcp.local.", 33, vec![0; 8]);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.to_frame().unwrap().op(), Op::ReconfirmRecord);

        let wildcard = ReconfirmRecordRequest::new(interface::ANY, "host.local.", 1, vec![0; 4]);
        assert_eq!(wildcard.validate(), Err(ServiceError::BadInterfaceIndex));

        let unnamed = ReconfirmRecordRequest::new(2, "", 1, vec![0; 4]);
        assert_eq!(unnamed.validate(), Err(ServiceError::BadParam));

        let oversized = ReconfirmRecordRequest::new(2, "host.local.", 1, vec![0; MAX_RECORD_LEN + 1]);
        assert_eq!(oversized.validate(), Err(ServiceError::BadParam));
    }

    #[test]
    fn flags_travel_in_header() {
        let req = Request::QueryRecord(QueryRequest::new("host.local.", 1).long_lived());
        let frame = req.to_frame().unwrap();
        assert!(frame.flags().contains(ServiceFlags::LONG_LIVED_QUERY));
        let sent: QueryRequest = frame.decode().unwrap();
        assert_eq!(sent.flags, ServiceFlags::empty());
        assert_eq!(sent.fullname, "host.local.");
    }
}
