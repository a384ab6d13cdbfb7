//! Rendering replies as text lines or JSON objects.

use std::collections::BTreeMap;

use dnssd_core::{ParsedTxtRecord, Reply};
use serde::Serialize;

/// Serializable view of one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyView {
    Domain {
        added: bool,
        default: bool,
        interface: u32,
        domain: String,
    },
    Browse {
        added: bool,
        interface: u32,
        name: String,
        regtype: String,
        domain: String,
    },
    Resolve {
        interface: u32,
        fullname: String,
        host: String,
        port: u16,
        txt: BTreeMap<String, Option<String>>,
    },
    Query {
        added: bool,
        interface: u32,
        fullname: String,
        rrtype: u16,
        rrclass: u16,
        rdata: String,
        ttl: u32,
    },
    Registered {
        added: bool,
        name: String,
        regtype: String,
        domain: String,
    },
    Record {
        record: u32,
    },
    PortMapping {
        interface: u32,
        external_address: String,
        protocol: u32,
        internal_port: u16,
        external_port: u16,
        ttl: u32,
    },
}

impl From<&Reply> for ReplyView {
    fn from(reply: &Reply) -> Self {
        match reply {
            Reply::Domain(r) => ReplyView::Domain {
                added: r.flags.is_add(),
                default: r.flags.contains(dnssd_core::ServiceFlags::DEFAULT),
                interface: r.interface,
                domain: r.domain.clone(),
            },
            Reply::Browse(r) => ReplyView::Browse {
                added: r.is_add(),
                interface: r.interface,
                name: r.name.clone(),
                regtype: r.regtype.clone(),
                domain: r.domain.clone(),
            },
            Reply::Resolve(r) => ReplyView::Resolve {
                interface: r.interface,
                fullname: r.fullname.clone(),
                host: r.host.clone(),
                port: r.port,
                txt: txt_map(&r.txt),
            },
            Reply::Query(r) => ReplyView::Query {
                added: r.flags.is_add(),
                interface: r.interface,
                fullname: r.fullname.clone(),
                rrtype: r.rrtype,
                rrclass: r.rrclass,
                rdata: to_hex(&r.rdata),
                ttl: r.ttl,
            },
            Reply::Registered(r) => ReplyView::Registered {
                added: r.flags.is_add(),
                name: r.name.clone(),
                regtype: r.regtype.clone(),
                domain: r.domain.clone(),
            },
            Reply::Record(r) => ReplyView::Record { record: r.record.0 },
            Reply::PortMapping(r) => ReplyView::PortMapping {
                interface: r.interface,
                external_address: r.external_address.to_string(),
                protocol: r.protocol,
                internal_port: r.internal_port,
                external_port: r.external_port,
                ttl: r.ttl,
            },
        }
    }
}

impl ReplyView {
    /// One human-readable line.
    pub fn to_line(&self) -> String {
        match self {
            ReplyView::Domain {
                added,
                default,
                interface,
                domain,
            } => format!(
                "{} if={interface} {domain}{}",
                sign(*added),
                if *default { " (default)" } else { "" }
            ),
            ReplyView::Browse {
                added,
                interface,
                name,
                regtype,
                domain,
            } => format!("{} if={interface} {name} {regtype} {domain}", sign(*added)),
            ReplyView::Resolve {
                fullname,
                host,
                port,
                txt,
                ..
            } => {
                let mut line = format!("{fullname} can be reached at {host}:{port}");
                for (k, v) in txt {
                    match v {
                        Some(v) => line.push_str(&format!(" {k}={v}")),
                        None => line.push_str(&format!(" {k}")),
                    }
                }
                line
            }
            ReplyView::Query {
                added,
                fullname,
                rrtype,
                rdata,
                ttl,
                ..
            } => format!("{} {fullname} type={rrtype} ttl={ttl} {rdata}", sign(*added)),
            ReplyView::Registered {
                added,
                name,
                regtype,
                domain,
            } => {
                let what = if *added { "registered" } else { "deregistered" };
                format!("{what} {name}.{regtype}{domain}")
            }
            ReplyView::Record { record } => format!("record {record} registered"),
            ReplyView::PortMapping {
                external_address,
                protocol,
                internal_port,
                external_port,
                ttl,
                ..
            } => format!(
                "{external_address} proto={protocol:#x} {internal_port} -> {external_port} ttl={ttl}"
            ),
        }
    }
}

/// Print `reply` to stdout as a text line or a JSON object.
pub fn print_reply(reply: &Reply, json: bool) {
    let view = ReplyView::from(reply);
    if json {
        match serde_json::to_string(&view) {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::warn!("cannot encode reply: {e}"),
        }
    } else {
        println!("{}", view.to_line());
    }
}

/// TXT entries keyed by (lossy) key; later duplicates never override
/// the first occurrence.
pub fn txt_map(txt: &ParsedTxtRecord) -> BTreeMap<String, Option<String>> {
    let mut map = BTreeMap::new();
    for entry in txt.iter() {
        map.entry(entry.key_lossy().into_owned())
            .or_insert_with(|| entry.value_lossy().map(|v| v.into_owned()));
    }
    map
}

fn sign(added: bool) -> &'static str {
    if added { "+" } else { "-" }
}

/// Lowercase hex, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse hex produced by [`to_hex`]; whitespace is ignored.
pub fn from_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(digits)
}
