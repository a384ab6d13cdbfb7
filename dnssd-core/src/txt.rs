//! DNS-SD TXT record codec (RFC 6763 §6).
//!
//! ## Wire format
//!
//! ```text
//! ┌─────┬───────────────────────┬─────┬──────────────┬ ─ ─
//! │ len │ key [ '=' value ]     │ len │ key          │
//! └─────┴───────────────────────┴─────┴──────────────┴ ─ ─
//! ```
//!
//! A record with no entries is not legal on the wire and is encoded as
//! one empty string (a single zero byte).
//!
//! [`TxtRecord`] builds records; [`ParsedTxtRecord`] reads received
//! ones without trusting the input.

use std::borrow::Cow;
use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::TxtError;

/// Longest encodable entry, length byte included.
pub const MAX_ENTRY_LEN: usize = 255;
/// Longest encodable key.
pub const MAX_KEY_LEN: usize = 255;
/// Longest record; TXT rdata length is a 16-bit field.
pub const MAX_RECORD_LEN: usize = u16::MAX as usize;

// ── Builder ──────────────────────────────────────────────────────

/// How a [`TxtRecord`] reacts when its capacity is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Growth {
    /// Capacity is only a hint.
    #[default]
    Growable,
    /// Capacity is a hard limit; exceeding it is `OutOfSpace`.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    value: Option<Vec<u8>>,
}

impl Entry {
    fn wire_len(key: &str, value: Option<&[u8]>) -> usize {
        1 + key.len() + value.map_or(0, |v| 1 + v.len())
    }

    fn len(&self) -> usize {
        Self::wire_len(&self.key, self.value.as_deref())
    }
}

/// A TXT record under construction.
///
/// Keys are unique ignoring ASCII case. Replacing a key keeps the
/// entry where it was first defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtRecord {
    entries: Vec<Entry>,
    capacity: usize,
    growth: Growth,
    len: usize,
}

impl Default for TxtRecord {
    fn default() -> Self {
        Self::create(0)
    }
}

impl TxtRecord {
    /// Create an empty record. `capacity_hint` is the expected wire size.
    pub fn create(capacity_hint: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity_hint,
            growth: Growth::Growable,
            len: 0,
        }
    }

    /// Create an empty record that refuses to grow past `capacity` bytes.
    pub fn fixed(capacity: usize) -> Self {
        Self {
            growth: Growth::Fixed,
            ..Self::create(capacity)
        }
    }

    /// Insert `key`, or replace its value in place.
    ///
    /// `None` stores a key-only entry, `Some(b"")` an empty value.
    pub fn set_value(&mut self, key: &str, value: Option<&[u8]>) -> Result<(), TxtError> {
        validate_key(key)?;
        let entry_len = Entry::wire_len(key, value);
        if entry_len > MAX_ENTRY_LEN {
            return Err(TxtError::EntryTooLarge(entry_len));
        }

        let existing = self.position(key);
        let old_len = existing.map_or(0, |i| self.entries[i].len());
        let needed = self.len - old_len + entry_len;
        self.reserve(needed)?;

        let entry = Entry {
            key: key.to_owned(),
            value: value.map(<[u8]>::to_vec),
        };
        match existing {
            Some(i) => self.entries[i] = entry,
            None => self.entries.push(entry),
        }
        self.len = needed;
        Ok(())
    }

    /// Remove `key`. The record is unchanged when the key is absent.
    pub fn remove_value(&mut self, key: &str) -> Result<(), TxtError> {
        let i = self.position(key).ok_or(TxtError::NoSuchKey)?;
        let entry = self.entries.remove(i);
        self.len -= entry.len();
        Ok(())
    }

    /// Canonical wire bytes. Never empty.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len.max(1));
        if self.entries.is_empty() {
            buf.put_u8(0);
            return buf.freeze();
        }
        for entry in &self.entries {
            buf.put_u8((entry.len() - 1) as u8);
            buf.put_slice(entry.key.as_bytes());
            if let Some(value) = &entry.value {
                buf.put_u8(b'=');
                buf.put_slice(value);
            }
        }
        buf.freeze()
    }

    /// Wire length of the live entries; `0` for an empty record.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Value of `key`. `None` for absent keys and key-only entries alike.
    pub fn get_value(&self, key: &str) -> Option<&[u8]> {
        self.position(key)
            .and_then(|i| self.entries[i].value.as_deref())
    }

    /// Entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = TxtEntry<'_>> {
        self.entries.iter().map(|e| TxtEntry {
            key: e.key.as_bytes(),
            value: e.value.as_deref(),
        })
    }

    /// Rebuild an editable record from a received one.
    ///
    /// Fails with `InvalidKey` when a received key is not printable ASCII.
    /// Later duplicates of a key replace the earlier value.
    pub fn from_parsed(parsed: &ParsedTxtRecord) -> Result<Self, TxtError> {
        let mut record = Self::create(parsed.as_bytes().len());
        for entry in parsed.iter() {
            let key = std::str::from_utf8(entry.key).map_err(|_| TxtError::InvalidKey)?;
            record.set_value(key, entry.value)?;
        }
        Ok(record)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.key.eq_ignore_ascii_case(key))
    }

    fn reserve(&mut self, needed: usize) -> Result<(), TxtError> {
        if needed > MAX_RECORD_LEN {
            return Err(TxtError::OutOfSpace {
                needed,
                capacity: MAX_RECORD_LEN,
            });
        }
        if needed > self.capacity {
            match self.growth {
                Growth::Fixed => {
                    return Err(TxtError::OutOfSpace {
                        needed,
                        capacity: self.capacity,
                    });
                }
                Growth::Growable => self.capacity = needed.max(self.capacity * 2),
            }
        }
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), TxtError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(TxtError::InvalidKey);
    }
    if key.bytes().any(|b| b == b'=' || !(0x20..=0x7e).contains(&b)) {
        return Err(TxtError::InvalidKey);
    }
    Ok(())
}

// ── Reader ───────────────────────────────────────────────────────

/// How [`ParsedTxtRecord::parse_with`] treats a truncated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Any truncation fails the whole parse.
    #[default]
    Strict,
    /// Keep the entries decoded before the truncation.
    Lenient,
}

/// One entry of a TXT record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxtEntry<'a> {
    pub key: &'a [u8],
    /// `None` when the entry has no `=`.
    pub value: Option<&'a [u8]>,
}

impl TxtEntry<'_> {
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.key)
    }

    pub fn value_lossy(&self) -> Option<Cow<'_, str>> {
        self.value.map(String::from_utf8_lossy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    key: Range<usize>,
    value: Option<Range<usize>>,
}

/// A TXT record decoded from received bytes.
///
/// Entries borrow from the original buffer. Lookups ignore ASCII case
/// and return the first match. Zero-length strings carry no key and
/// are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTxtRecord {
    data: Bytes,
    spans: Vec<Span>,
    truncated: bool,
}

impl ParsedTxtRecord {
    /// Strict parse of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, TxtError> {
        Self::parse_with(Bytes::copy_from_slice(data), ParseMode::Strict)
    }

    /// Parse `data` without copying, using `mode` for truncated input.
    pub fn parse_with(data: Bytes, mode: ParseMode) -> Result<Self, TxtError> {
        let mut spans = Vec::new();
        let mut truncated = false;
        let mut offset = 0;

        while offset < data.len() {
            let claimed = data[offset] as usize;
            let start = offset + 1;
            let remaining = data.len() - start;
            if claimed > remaining {
                if mode == ParseMode::Strict {
                    return Err(TxtError::Truncated {
                        offset,
                        claimed,
                        remaining,
                    });
                }
                tracing::debug!(offset, claimed, remaining, "dropping truncated txt entry");
                truncated = true;
                break;
            }

            let end = start + claimed;
            let span = match data[start..end].iter().position(|&b| b == b'=') {
                // a leading `=` names no key
                Some(0) => None,
                Some(eq) => Some(Span {
                    key: start..start + eq,
                    value: Some(start + eq + 1..end),
                }),
                None if claimed == 0 => None,
                None => Some(Span {
                    key: start..end,
                    value: None,
                }),
            };
            spans.extend(span);
            offset = end;
        }

        Ok(Self {
            data,
            spans,
            truncated,
        })
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// `true` when lenient parsing dropped a truncated tail.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Value of `key`. `None` for absent keys and key-only entries alike;
    /// use [`contains_key`](Self::contains_key) to tell them apart.
    pub fn get_value(&self, key: &str) -> Option<&[u8]> {
        self.find(key).and_then(|e| e.value)
    }

    pub fn entry_at(&self, index: usize) -> Result<TxtEntry<'_>, TxtError> {
        self.spans
            .get(index)
            .map(|s| self.entry(s))
            .ok_or(TxtError::IndexOutOfRange {
                index,
                count: self.spans.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = TxtEntry<'_>> {
        self.spans.iter().map(|s| self.entry(s))
    }

    /// The bytes this record was parsed from.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    fn entry(&self, span: &Span) -> TxtEntry<'_> {
        TxtEntry {
            key: &self.data[span.key.clone()],
            value: span.value.clone().map(|r| &self.data[r]),
        }
    }

    fn find(&self, key: &str) -> Option<TxtEntry<'_>> {
        self.iter().find(|e| e.key.eq_ignore_ascii_case(key.as_bytes()))
    }
}

impl Default for ParsedTxtRecord {
    fn default() -> Self {
        Self {
            data: Bytes::from_static(&[0]),
            spans: Vec::new(),
            truncated: false,
        }
    }
}
