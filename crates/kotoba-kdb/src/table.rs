use crate::wire::{Cursor, put_u32};
use crate::{KdbError, Record};

/// Whether a table carries the trailing identity-key array.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Layout {
    /// Header, offsets and payload only.
    Plain,
    /// Followed by one `u32` identity key per record (word tables).
    WithIdents,
}

/// Accumulates records in id order and emits the finished table.
#[derive(Debug)]
pub struct TableBuilder {
    layout: Layout,
    offsets: Vec<usize>,
    payload: Vec<u8>,
    idents: Vec<u32>,
}

impl TableBuilder {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            offsets: Vec::new(),
            payload: Vec::new(),
            idents: Vec::new(),
        }
    }

    /// Append the next record; its id is the number of records pushed so far.
    pub fn push<'a, R: Record<'a>>(&mut self, record: &R) -> Result<(), KdbError> {
        let start = self.payload.len();
        if let Err(err) = record.encode(&mut self.payload) {
            self.payload.truncate(start);
            return Err(err);
        }
        self.offsets.push(start);
        Ok(())
    }

    /// Append a record together with its identity key.
    pub fn push_with_ident<'a, R: Record<'a>>(
        &mut self,
        record: &R,
        ident: u32,
    ) -> Result<(), KdbError> {
        self.push(record)?;
        self.idents.push(ident);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Serialize header, offset index, payload and (for word tables) idents.
    pub fn finish(self) -> Result<Vec<u8>, KdbError> {
        let count = self.offsets.len();
        let payload_len = self.payload.len();
        let total = u32::try_from(payload_len).map_err(|_| KdbError::PayloadTooLarge(payload_len))?;
        let count_u32 = u32::try_from(count).map_err(|_| KdbError::PayloadTooLarge(payload_len))?;

        let ident_count = self.idents.len();
        let expected_idents = match self.layout {
            Layout::Plain => 0,
            Layout::WithIdents => count,
        };
        if ident_count != expected_idents {
            return Err(KdbError::IdentCountMismatch {
                records: count,
                idents: ident_count,
            });
        }

        let mut out = Vec::with_capacity(4 * (count + 2 + ident_count) + payload_len);
        put_u32(&mut out, count_u32);
        for offset in &self.offsets {
            // Every offset is at most the payload length, checked above.
            put_u32(&mut out, *offset as u32);
        }
        put_u32(&mut out, total);
        out.extend_from_slice(&self.payload);
        for ident in &self.idents {
            put_u32(&mut out, *ident);
        }
        Ok(out)
    }
}

/// Read-only view over an encoded table.
#[derive(Clone, Copy, Debug)]
pub struct Table<'a> {
    count: usize,
    offsets: &'a [u8],
    payload: &'a [u8],
    idents: Option<&'a [u8]>,
}

impl<'a> Table<'a> {
    /// Validate the header, the offset index and the trailing section.
    pub fn parse(bytes: &'a [u8], layout: Layout) -> Result<Self, KdbError> {
        let mut cur = Cursor::new(bytes);
        let count = cur.u32()? as usize;
        let index_len = count
            .checked_add(1)
            .and_then(|n| n.checked_mul(4))
            .ok_or(KdbError::Truncated {
                at: cur.position(),
                needed: usize::MAX,
                len: bytes.len(),
            })?;
        let offsets = cur.take(index_len)?;
        let payload_len = read_u32(offsets, count) as usize;
        let payload = cur.take(payload_len)?;

        let mut prev = 0u32;
        for index in 0..count {
            let start = read_u32(offsets, index);
            let end = read_u32(offsets, index + 1);
            if start != prev || end < start || end as usize > payload_len {
                return Err(KdbError::BadOffset {
                    index,
                    start,
                    end,
                    payload: payload_len,
                });
            }
            prev = end;
        }
        if count == 0 && payload_len != 0 {
            return Err(KdbError::TrailingBytes(payload_len));
        }

        let idents = match layout {
            Layout::Plain => None,
            Layout::WithIdents => Some(cur.take(count * 4)?),
        };
        cur.finish()?;

        Ok(Self {
            count,
            offsets,
            payload,
            idents,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Raw bytes of record `id`.
    pub fn record_bytes(&self, id: u32) -> Option<&'a [u8]> {
        let index = id as usize;
        if index >= self.count {
            return None;
        }
        let start = read_u32(self.offsets, index) as usize;
        let end = read_u32(self.offsets, index + 1) as usize;
        self.payload.get(start..end)
    }

    /// Decode record `id`.
    pub fn record<R: Record<'a>>(&self, id: u32) -> Result<R, KdbError> {
        let bytes = self.record_bytes(id).ok_or(KdbError::NoSuchRecord(id))?;
        R::decode(bytes)
    }

    /// Decode every record in id order.
    pub fn records<R: Record<'a>>(&self) -> impl Iterator<Item = Result<R, KdbError>> {
        let table = *self;
        (0..table.count as u32).map(move |id| table.record(id))
    }

    /// Identity key of record `id` (word tables only).
    pub fn ident(&self, id: u32) -> Option<u32> {
        let idents = self.idents?;
        if id as usize >= self.count {
            return None;
        }
        Some(read_u32(idents, id as usize))
    }

    /// All identity keys in id order; empty for plain tables.
    pub fn idents(&self) -> impl Iterator<Item = u32> {
        let idents = self.idents.unwrap_or(&[]);
        idents
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn read_u32(bytes: &[u8], index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
