//! Payload definitions for the daemon IPC protocol.
//!
//! Payloads are serialized with `serde` + `bincode` and carried inside
//! [`Frame`] bodies; flags and sub-registration indices live in the
//! frame header.
//!
//! [`Frame`]: crate::frame::Frame

pub mod reply;
pub mod request;

pub use reply::{
    BrowseReply, DomainReply, PortMappingReply, QueryReply, RecordReply, RegisterReply, Reply,
    ResolvePayload, ResolveReply,
};
pub use request::{
    AddRecordRequest, BrowseRequest, ConnectionRequest, EnumerateDomainsRequest,
    PortMappingRequest, QueryRequest, ReconfirmRecordRequest, RegisterRecordRequest,
    RegisterServiceRequest, RemoveRecordRequest, Request, ResolveRequest, UpdateRecordRequest,
};

/// Resource record types and classes.
pub mod rr {
    pub const TYPE_A: u16 = 1;
    pub const TYPE_CNAME: u16 = 5;
    pub const TYPE_PTR: u16 = 12;
    pub const TYPE_TXT: u16 = 16;
    pub const TYPE_AAAA: u16 = 28;
    pub const TYPE_SRV: u16 = 33;
    pub const TYPE_ANY: u16 = 255;

    pub const CLASS_IN: u16 = 1;

    /// Parse a record type name such as `A`, `txt` or a decimal number.
    pub fn type_from_name(name: &str) -> Option<u16> {
        let t = match name.to_ascii_uppercase().as_str() {
            "A" => TYPE_A,
            "CNAME" => TYPE_CNAME,
            "PTR" => TYPE_PTR,
            "TXT" => TYPE_TXT,
            "AAAA" => TYPE_AAAA,
            "SRV" => TYPE_SRV,
            "ANY" => TYPE_ANY,
            other => return other.parse().ok(),
        };
        Some(t)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn names_and_numbers() {
            assert_eq!(type_from_name("txt"), Some(TYPE_TXT));
            assert_eq!(type_from_name("AAAA"), Some(TYPE_AAAA));
            assert_eq!(type_from_name("65"), Some(65));
            assert_eq!(type_from_name("bogus"), None);
        }
    }
}
