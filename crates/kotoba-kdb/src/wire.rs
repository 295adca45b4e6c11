use crate::KdbError;

pub(crate) fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write a `u16` element count, saturating. Returns how many elements the
/// caller should actually emit.
pub(crate) fn put_count(out: &mut Vec<u8>, len: usize) -> usize {
    let count = saturate_u16(len);
    put_u16(out, count);
    count as usize
}

/// Write a `u16` length-prefixed string, truncated on a char boundary when it
/// does not fit.
pub(crate) fn put_str(out: &mut Vec<u8>, text: &str) {
    let mut end = text.len().min(u16::MAX as usize);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    put_u16(out, end as u16);
    out.extend_from_slice(&text.as_bytes()[..end]);
}

pub(crate) fn saturate_u16(value: usize) -> u16 {
    value.min(u16::MAX as usize) as u16
}

/// Little-endian reader over a borrowed buffer.
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], KdbError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(KdbError::Truncated {
                at: self.pos,
                needed: n,
                len: self.bytes.len(),
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, KdbError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, KdbError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn str(&mut self) -> Result<&'a str, KdbError> {
        let len = self.u16()? as usize;
        Ok(std::str::from_utf8(self.take(len)?)?)
    }

    pub(crate) fn finish(&self) -> Result<(), KdbError> {
        match self.bytes.len() - self.pos {
            0 => Ok(()),
            extra => Err(KdbError::TrailingBytes(extra)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_strings_truncate_on_char_boundary() {
        let text = "あ".repeat(30_000);
        let mut out = Vec::new();
        put_str(&mut out, &text);
        let len = u16::from_le_bytes([out[0], out[1]]) as usize;
        assert_eq!(len, 65_535 - 65_535 % 3);
        assert!(std::str::from_utf8(&out[2..]).is_ok());
    }

    #[test]
    fn cursor_reports_truncation() {
        let mut cursor = Cursor::new(&[1, 0, 5]);
        assert_eq!(cursor.u16().unwrap(), 1);
        assert!(matches!(
            cursor.u32(),
            Err(KdbError::Truncated {
                at: 2,
                needed: 4,
                len: 3
            })
        ));
    }
}
