//! Bounds-checked little-endian byte cursor
//!
//! Every read returns a [`Field`]: the decoded value, or the type's default
//! when the read would run past the end of the buffer, together with a flag
//! saying which of the two happened. Callers choose whether to degrade
//! (`value()`) or escalate (`require()`).

use crate::{Result, TelemetryError};

/// A value read from a buffer, possibly substituted by a default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<T> {
    value: T,
    truncated: bool,
}

impl<T> Field<T> {
    fn read(value: T) -> Self {
        Self { value, truncated: false }
    }

    fn missing(default: T) -> Self {
        Self { value: default, truncated: true }
    }

    /// The decoded value, or the default substitute.
    pub fn value(self) -> T {
        self.value
    }

    /// True when the read ran out of bounds and `value()` is a default.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Escalate a truncated read into an error.
    pub fn require(self, context: &str) -> Result<T> {
        if self.truncated {
            Err(TelemetryError::Parse {
                context: context.to_string(),
                details: "field extends beyond buffer".to_string(),
            })
        } else {
            Ok(self.value)
        }
    }
}

/// Cursor over a byte slice that never panics on short input.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    truncated_reads: u32,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, truncated_reads: 0 }
    }

    /// Cursor positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset, truncated_reads: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of reads so far that fell back to a default.
    pub fn truncated_reads(&self) -> u32 {
        self.truncated_reads
    }

    pub fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    /// Take the next `N` bytes, advancing the cursor either way.
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let data = self.data;
        let start = self.pos;
        self.pos = self.pos.saturating_add(N);
        let bytes = data.get(start..start.checked_add(N)?)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }

    fn field<const N: usize, T: Default>(&mut self, convert: fn([u8; N]) -> T) -> Field<T> {
        match self.take::<N>() {
            Some(bytes) => Field::read(convert(bytes)),
            None => {
                self.truncated_reads += 1;
                Field::missing(T::default())
            }
        }
    }

    #[inline]
    pub fn u8(&mut self) -> Field<u8> {
        self.field(|[b]: [u8; 1]| b)
    }

    #[inline]
    pub fn i8(&mut self) -> Field<i8> {
        self.field(|b: [u8; 1]| i8::from_le_bytes(b))
    }

    #[inline]
    pub fn bool(&mut self) -> Field<bool> {
        self.field(|[b]: [u8; 1]| b != 0)
    }

    #[inline]
    pub fn u16_le(&mut self) -> Field<u16> {
        self.field(u16::from_le_bytes)
    }

    #[inline]
    pub fn u32_le(&mut self) -> Field<u32> {
        self.field(u32::from_le_bytes)
    }

    #[inline]
    pub fn u64_le(&mut self) -> Field<u64> {
        self.field(u64::from_le_bytes)
    }

    /// Non-finite floats are treated as zero.
    #[inline]
    pub fn f32_le(&mut self) -> Field<f32> {
        let mut field = self.field(f32::from_le_bytes);
        if !field.value.is_finite() {
            field.value = 0.0;
        }
        field
    }

    pub fn u8_array<const N: usize>(&mut self) -> Field<[u8; N]> {
        match self.take::<N>() {
            Some(bytes) => Field::read(bytes),
            None => {
                self.truncated_reads += 1;
                Field::missing([0u8; N])
            }
        }
    }

    pub fn u16_le_array<const N: usize>(&mut self) -> Field<[u16; N]> {
        let mut arr = [0u16; N];
        let mut truncated = false;
        for item in arr.iter_mut() {
            let field = self.u16_le();
            truncated |= field.is_truncated();
            *item = field.value();
        }
        Field { value: arr, truncated }
    }

    /// Fixed-width UTF-8 string: cut at the first NUL, lossily decoded and
    /// trimmed of surrounding whitespace.
    pub fn fixed_str(&mut self, len: usize) -> Field<String> {
        let data = self.data;
        let start = self.pos;
        self.pos = self.pos.saturating_add(len);
        let Some(bytes) = start.checked_add(len).and_then(|end| data.get(start..end)) else {
            self.truncated_reads += 1;
            return Field::missing(String::new());
        };
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = String::from_utf8_lossy(bytes.get(..end).unwrap_or_default());
        Field::read(text.trim().to_string())
    }
}
