//! Service-name helpers: full-name construction and argument checks
//! applied before a request leaves the process.

use crate::error::ServiceError;

/// Longest legal escaped domain name, terminating NUL included.
pub const MAX_DOMAIN_NAME: usize = 1009;
/// Longest service instance name.
pub const MAX_SERVICE_NAME: usize = 63;

/// Interface index constants.
pub mod interface {
    /// All interfaces.
    pub const ANY: u32 = 0;
    /// Records visible only on this machine.
    pub const LOCAL_ONLY: u32 = u32::MAX;
    /// Unicast DNS only.
    pub const UNICAST: u32 = u32::MAX - 1;
    /// Peer-to-peer interfaces.
    pub const P2P: u32 = u32::MAX - 2;
    /// Bluetooth Low Energy.
    pub const BLE: u32 = u32::MAX - 3;
}

/// Join a service instance name, a service type and a domain into one
/// escaped domain name, e.g. `My\.Printer._ipp._tcp.local.`.
///
/// Dots and backslashes in `service` are escaped; `regtype` and `domain`
/// are taken as already escaped. `service == None` builds the PTR name.
pub fn construct_full_name(
    service: Option<&str>,
    regtype: &str,
    domain: &str,
) -> Result<String, ServiceError> {
    if regtype.is_empty() || domain.is_empty() {
        return Err(ServiceError::BadParam);
    }

    let mut name = String::with_capacity(regtype.len() + domain.len() + 64);
    if let Some(service) = service {
        for c in service.chars() {
            match c {
                '.' | '\\' => {
                    name.push('\\');
                    name.push(c);
                }
                c if (c as u32) < 0x20 || c == '\x7f' => {
                    name.push_str(&format!("\\{:03}", c as u32));
                }
                c => name.push(c),
            }
        }
        name.push('.');
    }

    name.push_str(regtype);
    if !regtype.ends_with('.') {
        name.push('.');
    }
    name.push_str(domain);
    if !domain.ends_with('.') {
        name.push('.');
    }

    if name.len() >= MAX_DOMAIN_NAME {
        return Err(ServiceError::BadParam);
    }
    Ok(name)
}

/// Check a service type such as `_http._tcp`, `_ipp._tcp,_universal`
/// or `_http._tcp:group,_sub`.
///
/// The type label is `_` plus 1–15 letters, digits or hyphens; the
/// protocol is `_tcp` or `_udp`. Subtype labels are 1–63 bytes.
pub fn validate_regtype(regtype: &str) -> Result<(), ServiceError> {
    let mut parts = regtype.trim_end_matches('.').split(',');
    let primary = parts.next().unwrap_or_default();
    let primary = primary.split(':').next().unwrap_or_default();

    let (service, proto) = primary.split_once('.').ok_or(ServiceError::BadParam)?;
    let label = service.strip_prefix('_').ok_or(ServiceError::BadParam)?;
    if label.is_empty()
        || label.len() > 15
        || !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(ServiceError::BadParam);
    }
    if !matches!(proto, "_tcp" | "_udp") {
        return Err(ServiceError::BadParam);
    }

    for sub in parts {
        if sub.is_empty() || sub.len() > MAX_SERVICE_NAME {
            return Err(ServiceError::BadParam);
        }
    }
    Ok(())
}

/// Check a service instance name. Longer names are only an error when
/// the daemon is not allowed to rename (truncate) them.
pub fn validate_service_name(name: &str, no_auto_rename: bool) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::BadParam);
    }
    if no_auto_rename && name.len() > MAX_SERVICE_NAME {
        return Err(ServiceError::BadParam);
    }
    Ok(())
}
