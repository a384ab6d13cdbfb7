//! Service flags carried in every frame header.

use bitflags::bitflags;

bitflags! {
    /// Flags exchanged with the daemon on requests and replies.
    ///
    /// Wire values follow the DNS-SD client API.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ServiceFlags: u32 {
        /// More replies are queued; process them before waiting again.
        const MORE_COMING = 0x1;
        /// The reply announces an addition (browse, domains, register).
        /// Absent means removal.
        const ADD = 0x2;
        /// The domain is a default domain.
        const DEFAULT = 0x4;
        /// Do not rename automatically on a name conflict.
        const NO_AUTO_RENAME = 0x8;
        /// Shared record: several hosts may hold it.
        const SHARED = 0x10;
        /// Unique record: this host is the only holder.
        const UNIQUE = 0x20;
        /// Enumerate domains recommended for browsing.
        const BROWSE_DOMAINS = 0x40;
        /// Enumerate domains recommended for registration.
        const REGISTRATION_DOMAINS = 0x80;
        /// Keep a unicast query open for change notifications.
        const LONG_LIVED_QUERY = 0x100;
        /// Answer queries from remote hosts for this record.
        const ALLOW_REMOTE_QUERY = 0x200;
        /// Force multicast even for non-local names.
        const FORCE_MULTICAST = 0x400;
        /// Deliver intermediate CNAME results and negative answers.
        const RETURN_INTERMEDIATES = 0x1000;
    }
}

impl ServiceFlags {
    /// Returns `true` when the reply announces an addition.
    pub fn is_add(self) -> bool {
        self.contains(ServiceFlags::ADD)
    }

    /// Returns `true` when more replies are immediately available.
    pub fn more_coming(self) -> bool {
        self.contains(ServiceFlags::MORE_COMING)
    }
}

bitflags! {
    /// Transport protocols requested in a NAT port mapping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PortMappingProtocol: u32 {
        const UDP = 0x10;
        const TCP = 0x20;
    }
}
