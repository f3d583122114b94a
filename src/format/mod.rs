// src/format/mod.rs

//! Safe string formatting for command lines and secret payloads.
//!
//! Templates combine trusted structure with less-trusted substrings, so only
//! a whitelist is understood:
//!
//! - literal text and `%%`
//! - `%[position$][-| ][width][.precision]s`
//!
//! Every supplied argument must be referenced by exactly one conversion.
//! This keeps argument lists and templates in lockstep, so a value can't be
//! silently dropped from a command line. Positions, widths and precisions
//! are capped at `i32::MAX`.
//!
//! Templates are parsed and validated in full before anything is emitted;
//! on error no output is produced at all.

pub mod template;

pub use template::{Conversion, Segment, Template};

use crate::errors::FormatError;

/// Expand `template`, streaming each piece to `sink` as it is produced.
///
/// Returns the total number of bytes emitted.
pub fn format_to_sink<F>(template: &str, args: &[&str], mut sink: F) -> Result<usize, FormatError>
where
    F: FnMut(&[u8]),
{
    let parsed = Template::parse(template, args.len())?;
    Ok(parsed.emit(args, &mut sink))
}

/// Expand `template` into a fixed-capacity buffer.
///
/// At most `buf.len() - 1` bytes are written, followed by a NUL terminator
/// (nothing at all for an empty buffer). The return value is the full
/// length of the expansion, which exceeds the written length when `buf` is
/// too small, so callers can retry with a larger buffer.
pub fn format_to_buffer(template: &str, buf: &mut [u8], args: &[&str]) -> Result<usize, FormatError> {
    let parsed = Template::parse(template, args.len())?;

    let limit = buf.len().saturating_sub(1);
    let mut written = 0;
    let total = parsed.emit(args, &mut |piece: &[u8]| {
        let n = piece.len().min(limit - written);
        buf[written..written + n].copy_from_slice(&piece[..n]);
        written += n;
    });

    if let Some(terminator) = buf.get_mut(written) {
        *terminator = 0;
    }

    Ok(total)
}

/// Expand `template` into a new byte vector.
pub fn format_to_vec(template: &str, args: &[&str]) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    format_to_sink(template, args, |piece| out.extend_from_slice(piece))?;
    Ok(out)
}
