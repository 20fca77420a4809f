//! SVG path data parser
//!
//! Accepts the full SVG path grammar: optional separators, compact numbers
//! (`1.5.5`, `-1-2`, `1e-3`), compact arc flags (`a1 1 0 01 5 5`) and
//! implicit command repetition (extra pairs after `M` are line-tos).

use crate::error::{PathError, Result};
use crate::path::{CommandKind, PathData, Segment};
use smallvec::SmallVec;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a str) -> Self {
        Self {
            bytes: data.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_number(&mut self) -> bool {
        self.skip_separators();
        matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'-' || b == b'+' || b == b'.')
    }

    fn number(&mut self) -> Result<f32> {
        self.skip_separators();
        let start = self.pos;
        let bytes = self.bytes;

        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        let mut digits = 0;
        while matches!(bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
            digits += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return Err(PathError::parse(start, "expected a number"));
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'-') | Some(b'+')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while matches!(bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == exp_start {
                // Not an exponent after all
                self.pos = mark;
            }
        }

        let text = std::str::from_utf8(&bytes[start..self.pos])
            .map_err(|_| PathError::parse(start, "invalid number"))?;
        let value: f32 = text
            .parse()
            .map_err(|_| PathError::parse(start, format!("invalid number `{}`", text)))?;
        if !value.is_finite() {
            return Err(PathError::parse(start, "number out of range"));
        }
        Ok(value)
    }

    fn flag(&mut self) -> Result<f32> {
        self.skip_separators();
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(0.0)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(1.0)
            }
            _ => Err(PathError::parse(self.pos, "expected arc flag 0 or 1")),
        }
    }
}

/// Parse SVG path data into normalized segments
pub fn parse(data: &str) -> Result<PathData> {
    let mut cursor = Cursor::new(data);
    let mut segments = Vec::new();

    loop {
        cursor.skip_separators();
        let Some(byte) = cursor.peek() else {
            break;
        };

        let letter = byte as char;
        let (kind, relative) = CommandKind::from_letter(letter).ok_or_else(|| {
            PathError::parse(cursor.pos, format!("unexpected character `{}`", letter))
        })?;
        if segments.is_empty() && kind != CommandKind::MoveTo {
            return Err(PathError::parse(
                cursor.pos,
                "path data must begin with a moveto command",
            ));
        }
        cursor.pos += 1;

        if kind == CommandKind::Close {
            segments.push(Segment::new(kind, relative, &[]));
            continue;
        }

        // The first parameter set is mandatory; more sets repeat the command.
        let mut current = kind;
        let mut first = true;
        while first || cursor.at_number() {
            let mut args: SmallVec<[f32; 7]> = SmallVec::new();
            for i in 0..current.arity() {
                let value = if current.is_flag(i) {
                    cursor.flag()?
                } else {
                    cursor.number()?
                };
                args.push(value);
            }
            segments.push(Segment {
                kind: current,
                relative,
                args,
            });
            // Subsequent pairs after a moveto are implicit line-tos
            if current == CommandKind::MoveTo {
                current = CommandKind::LineTo;
            }
            first = false;
        }
    }

    Ok(PathData::from_segments(segments))
}
