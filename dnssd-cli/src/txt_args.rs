//! TXT records from `key=value` command-line arguments.

use dnssd_core::{TxtError, TxtRecord};

/// Split `key=value` into its parts. A bare `key` has no value; `key=`
/// has an empty one.
pub fn split_assignment(arg: &str) -> (&str, Option<&[u8]>) {
    match arg.split_once('=') {
        Some((key, value)) => (key, Some(value.as_bytes())),
        None => (arg, None),
    }
}

/// Build a record from arguments in order. A repeated key replaces the
/// earlier value in place.
pub fn build_record<S: AsRef<str>>(args: &[S], capacity: usize) -> Result<TxtRecord, TxtError> {
    let mut record = TxtRecord::create(capacity);
    for arg in args {
        let (key, value) = split_assignment(arg.as_ref());
        record.set_value(key, value)?;
    }
    Ok(record)
}
