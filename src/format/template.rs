// src/format/template.rs

//! Template parsing for the safe formatter.

use crate::errors::FormatError;

/// A `%s` conversion after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// 1-based index into the argument list.
    pub position: usize,
    pub left_align: bool,
    pub width: Option<usize>,
    pub precision: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a [u8]),
    Conversion(Conversion),
}

/// A template parsed and validated against a fixed argument count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    segments: Vec<Segment<'a>>,
}

const SPACES: [u8; 32] = [b' '; 32];

/// Largest position, width or precision accepted (C `INT_MAX`).
const MAX_NUMBER: usize = i32::MAX as usize;

impl<'a> Template<'a> {
    /// Parse `template` for use with exactly `num_args` arguments.
    ///
    /// Fails if any conversion is malformed or unsupported, refers to a
    /// position outside `1..=num_args` or to an argument already used, or if
    /// an argument is never used.
    pub fn parse(template: &'a str, num_args: usize) -> Result<Self, FormatError> {
        let bytes = template.as_bytes();
        let mut segments = Vec::new();
        let mut used = vec![false; num_args];
        let mut ordinal = 0usize;
        let mut literal_start = 0usize;
        let mut at = 0usize;

        while at < bytes.len() {
            if bytes[at] != b'%' {
                at += 1;
                continue;
            }

            if literal_start < at {
                segments.push(Segment::Literal(&bytes[literal_start..at]));
            }

            let start = at;
            at += 1;

            if bytes.get(at) == Some(&b'%') {
                segments.push(Segment::Literal(b"%"));
                at += 1;
                literal_start = at;
                continue;
            }

            // `%N$`: the digits only form a position when followed by '$'.
            let mut position = None;
            let (digits, after) = scan_number(bytes, at).ok_or(FormatError::Malformed(start))?;
            if let (Some(n), Some(b'$')) = (digits, bytes.get(after)) {
                position = Some(n);
                at = after + 1;
            }

            let mut left_align = false;
            while let Some(&flag) = bytes.get(at) {
                match flag {
                    b'-' => left_align = true,
                    b' ' => {}
                    _ => break,
                }
                at += 1;
            }

            let (width, after) = scan_number(bytes, at).ok_or(FormatError::Malformed(start))?;
            at = after;

            let mut precision = None;
            if bytes.get(at) == Some(&b'.') {
                let (digits, after) =
                    scan_number(bytes, at + 1).ok_or(FormatError::Malformed(start))?;
                precision = Some(digits.unwrap_or(0));
                at = after;
            }

            match bytes.get(at) {
                Some(b's') => at += 1,
                Some(_) => {
                    let found = template[at..].chars().next().unwrap_or('?');
                    return Err(FormatError::UnsupportedConversion(found));
                }
                None => return Err(FormatError::Malformed(start)),
            }

            ordinal += 1;
            let position = position.unwrap_or(ordinal);
            if position == 0 || position > num_args {
                return Err(FormatError::InvalidPosition(position));
            }
            if std::mem::replace(&mut used[position - 1], true) {
                return Err(FormatError::DuplicatePosition(position));
            }

            segments.push(Segment::Conversion(Conversion {
                position,
                left_align,
                width,
                precision,
            }));
            literal_start = at;
        }

        if literal_start < bytes.len() {
            segments.push(Segment::Literal(&bytes[literal_start..]));
        }

        if let Some(unused) = used.iter().position(|u| !u) {
            return Err(FormatError::UnusedArgument(unused + 1));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// Emit every piece to `sink`, returning the total length emitted.
    pub fn emit<F>(&self, args: &[&str], sink: &mut F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut total: usize = 0;

        for segment in &self.segments {
            match *segment {
                Segment::Literal(text) => {
                    sink(text);
                    total = total.saturating_add(text.len());
                }
                Segment::Conversion(conv) => {
                    let arg = args
                        .get(conv.position - 1)
                        .map(|a| a.as_bytes())
                        .unwrap_or_default();
                    let arg = match conv.precision {
                        Some(max) => &arg[..max.min(arg.len())],
                        None => arg,
                    };
                    let padding = conv.width.map_or(0, |w| w.saturating_sub(arg.len()));

                    if !conv.left_align {
                        emit_padding(padding, sink);
                    }
                    sink(arg);
                    if conv.left_align {
                        emit_padding(padding, sink);
                    }
                    total = total.saturating_add(arg.len()).saturating_add(padding);
                }
            }
        }

        total
    }
}

fn emit_padding<F>(mut count: usize, sink: &mut F)
where
    F: FnMut(&[u8]),
{
    while count > 0 {
        let n = count.min(SPACES.len());
        sink(&SPACES[..n]);
        count -= n;
    }
}

/// Scan decimal digits starting at `at`.
///
/// Returns the value (`None` when there are no digits) and the offset after
/// the digits, or `None` overall if the value exceeds [`MAX_NUMBER`].
fn scan_number(bytes: &[u8], mut at: usize) -> Option<(Option<usize>, usize)> {
    let mut value: Option<usize> = None;
    while let Some(&b) = bytes.get(at) {
        if !b.is_ascii_digit() {
            break;
        }
        let digit = usize::from(b - b'0');
        let next = value.unwrap_or(0).checked_mul(10)?.checked_add(digit)?;
        if next > MAX_NUMBER {
            return None;
        }
        value = Some(next);
        at += 1;
    }
    Some((value, at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(position: usize) -> Conversion {
        Conversion {
            position,
            left_align: false,
            width: None,
            precision: None,
        }
    }

    #[test]
    fn parses_literals_and_conversions_in_order() {
        let t = Template::parse("a %s b %s", 2).unwrap();
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal(b"a "),
                Segment::Conversion(conv(1)),
                Segment::Literal(b" b "),
                Segment::Conversion(conv(2)),
            ]
        );
    }

    #[test]
    fn parses_flags_width_and_precision() {
        let t = Template::parse("%2$-12.4s%1$ 3s", 2).unwrap();
        assert_eq!(
            t.segments(),
            &[
                Segment::Conversion(Conversion {
                    position: 2,
                    left_align: true,
                    width: Some(12),
                    precision: Some(4),
                }),
                Segment::Conversion(Conversion {
                    position: 1,
                    left_align: false,
                    width: Some(3),
                    precision: None,
                }),
            ]
        );
    }

    #[test]
    fn bare_dot_means_zero_precision() {
        let t = Template::parse("%.s", 1).unwrap();
        assert_eq!(
            t.segments(),
            &[Segment::Conversion(Conversion {
                precision: Some(0),
                ..conv(1)
            })]
        );
    }

    #[test]
    fn unnumbered_conversions_follow_appearance_order() {
        let t = Template::parse("%3$s %s %1$s", 3).unwrap();
        let positions: Vec<usize> = t
            .segments()
            .iter()
            .filter_map(|s| match s {
                Segment::Conversion(c) => Some(c.position),
                Segment::Literal(_) => None,
            })
            .collect();
        assert_eq!(positions, vec![3, 2, 1]);
    }

    #[test]
    fn rejects_reused_positions() {
        assert_eq!(
            Template::parse("%1$s and %1$s", 1),
            Err(FormatError::DuplicatePosition(1))
        );
        // The unnumbered conversion lands on position 2 as well.
        assert_eq!(
            Template::parse("%2$s %s", 2),
            Err(FormatError::DuplicatePosition(2))
        );
    }

    #[test]
    fn rejects_truncated_conversion() {
        assert_eq!(Template::parse("abc %", 0), Err(FormatError::Malformed(4)));
        assert_eq!(Template::parse("%-8", 1), Err(FormatError::Malformed(0)));
    }

    #[test]
    fn rejects_overflowing_numbers() {
        let huge = format!("%{}s", "9".repeat(40));
        assert_eq!(Template::parse(&huge, 1), Err(FormatError::Malformed(0)));

        let word = format!("x%{}s", usize::MAX);
        assert_eq!(Template::parse(&word, 1), Err(FormatError::Malformed(1)));
    }

    #[test]
    fn numbers_are_capped_at_int_max() {
        let max = i32::MAX;
        assert!(Template::parse(&format!("%{max}s"), 1).is_ok());
        assert!(Template::parse(&format!("%.{max}s"), 1).is_ok());

        let above = max as u64 + 1;
        assert_eq!(
            Template::parse(&format!("%{above}s"), 1),
            Err(FormatError::Malformed(0))
        );
        assert_eq!(
            Template::parse(&format!("ab%.{above}s"), 1),
            Err(FormatError::Malformed(2))
        );
        assert_eq!(
            Template::parse(&format!("%{above}$s"), 1),
            Err(FormatError::Malformed(0))
        );
    }

    #[test]
    fn rejects_other_conversions() {
        assert_eq!(
            Template::parse("%d", 1),
            Err(FormatError::UnsupportedConversion('d'))
        );
        assert_eq!(
            Template::parse("%$s", 1),
            Err(FormatError::UnsupportedConversion('$'))
        );
        assert_eq!(
            Template::parse("%é", 1),
            Err(FormatError::UnsupportedConversion('é'))
        );
    }

    #[test]
    fn emit_pads_in_chunks() {
        let t = Template::parse("%70s|", 1).unwrap();
        let mut out = Vec::new();
        let n = t.emit(&["x"], &mut |piece: &[u8]| out.extend_from_slice(piece));
        assert_eq!(n, 71);
        assert_eq!(out.len(), 71);
        assert!(out[..69].iter().all(|&b| b == b' '));
        assert_eq!(&out[69..], b"x|");
    }
}
