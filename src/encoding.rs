//! Encoding resolution for container exports and dump files.
//!
//! Container exports come from an external tool whose output encoding is not
//! declared, so the resolver tries an ordered candidate list and keeps the
//! first strict decode. Dump files are a single large stream: they are always
//! decoded lossily, substituting U+FFFD for malformed sequences, so one bad
//! byte never costs a table its data.

use std::io::Read;

use anyhow::{Result, anyhow};
use encoding_rs::{BIG5, Encoding, GBK, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;

/// Default candidates for text produced by the container export tools.
pub const CONTAINER_CANDIDATES: [&Encoding; 3] = [UTF_8, GBK, BIG5];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

pub fn resolve_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| anyhow!("Unknown encoding '{label}'"))
}

pub fn resolve_labels(labels: &[String]) -> Result<Vec<&'static Encoding>> {
    labels.iter().map(|label| resolve_label(label)).collect()
}

/// Returns the first candidate that decodes `bytes` without malformed
/// sequences, or `None` when every candidate fails.
pub fn resolve_first(bytes: &[u8], candidates: &[&'static Encoding]) -> Option<Decoded> {
    candidates.iter().find_map(|&encoding| {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            log::trace!("Output is not valid {}", encoding.name());
            None
        } else {
            Some(Decoded {
                text: strip_bom(text.as_ref()).to_string(),
                encoding,
            })
        }
    })
}

/// Reads `reader` to a string without ever failing on malformed input,
/// substituting U+FFFD. A byte-order mark overrides `encoding` and is dropped.
pub fn read_lossy<R: Read>(reader: R, encoding: &'static Encoding) -> std::io::Result<String> {
    let mut decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .bom_override(true)
        .strip_bom(true)
        .build(reader);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}
