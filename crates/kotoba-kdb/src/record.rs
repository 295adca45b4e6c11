//! Record bodies stored in the table payload.
//!
//! Counts and lengths written as `u16` saturate at `u16::MAX`: only the
//! first 65535 elements are stored, and over-long strings are cut at the last
//! UTF-8 boundary that fits.

use crate::wire::{Cursor, put_count, put_str, put_u16, put_u32};
use crate::{KdbError, MAX_PACKED_WORD_ID};

/// A record that can be written to and read back from a table payload.
pub trait Record<'a>: Sized {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), KdbError>;
    fn decode(bytes: &'a [u8]) -> Result<Self, KdbError>;
}

/// `u16 nameLen, name, u32 memberCount, u32[memberCount] wordId`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CategoryRecord<'a> {
    pub name: &'a str,
    /// Member word ids, ascending.
    pub members: Vec<u32>,
}

impl<'a> Record<'a> for CategoryRecord<'a> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), KdbError> {
        put_str(out, self.name);
        put_u32(out, self.members.len() as u32);
        for word in &self.members {
            put_u32(out, *word);
        }
        Ok(())
    }

    fn decode(bytes: &'a [u8]) -> Result<Self, KdbError> {
        let mut cur = Cursor::new(bytes);
        let name = cur.str()?;
        let count = cur.u32()? as usize;
        let members = (0..count).map(|_| cur.u32()).collect::<Result<_, _>>()?;
        cur.finish()?;
        Ok(Self { name, members })
    }
}

/// One example-sentence span inside a word record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RefRecord {
    pub sentence: u32,
    pub start: u16,
    pub end: u16,
}

/// Literal forms, reading forms, per-sense glosses, category ids and
/// sentence references, each list prefixed with a `u16` count.
///
/// Part-of-speech tags are not stored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WordRecord<'a> {
    pub literals: Vec<&'a str>,
    pub readings: Vec<&'a str>,
    pub senses: Vec<Vec<&'a str>>,
    pub categories: Vec<u16>,
    pub refs: Vec<RefRecord>,
}

impl<'a> Record<'a> for WordRecord<'a> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), KdbError> {
        put_strings(out, &self.literals);
        put_strings(out, &self.readings);

        let senses = put_count(out, self.senses.len());
        for glosses in &self.senses[..senses] {
            put_strings(out, glosses);
        }

        let categories = put_count(out, self.categories.len());
        for category in &self.categories[..categories] {
            put_u16(out, *category);
        }

        let refs = put_count(out, self.refs.len());
        for r in &self.refs[..refs] {
            put_u32(out, r.sentence);
            put_u16(out, r.start);
            put_u16(out, r.end);
        }
        Ok(())
    }

    fn decode(bytes: &'a [u8]) -> Result<Self, KdbError> {
        let mut cur = Cursor::new(bytes);
        let literals = read_strings(&mut cur)?;
        let readings = read_strings(&mut cur)?;

        let sense_count = cur.u16()? as usize;
        let senses = (0..sense_count)
            .map(|_| read_strings(&mut cur))
            .collect::<Result<_, _>>()?;

        let category_count = cur.u16()? as usize;
        let categories = (0..category_count)
            .map(|_| cur.u16())
            .collect::<Result<_, _>>()?;

        let ref_count = cur.u16()? as usize;
        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            refs.push(RefRecord {
                sentence: cur.u32()?,
                start: cur.u16()?,
                end: cur.u16()?,
            });
        }
        cur.finish()?;

        Ok(Self {
            literals,
            readings,
            senses,
            categories,
            refs,
        })
    }
}

/// `u16 len, readingText, u16 len, translationText`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SentenceRecord<'a> {
    pub reading: &'a str,
    pub translation: &'a str,
}

impl<'a> Record<'a> for SentenceRecord<'a> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), KdbError> {
        put_str(out, self.reading);
        put_str(out, self.translation);
        Ok(())
    }

    fn decode(bytes: &'a [u8]) -> Result<Self, KdbError> {
        let mut cur = Cursor::new(bytes);
        let reading = cur.str()?;
        let translation = cur.str()?;
        cur.finish()?;
        Ok(Self {
            reading,
            translation,
        })
    }
}

/// A word id and sense rank packed as `(rank & 0xF) << 28 | wordId`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PackedWord {
    pub word: u32,
    pub rank: u8,
}

impl PackedWord {
    /// Pack into a single `u32`; the rank saturates at 15.
    pub fn pack(self) -> Result<u32, KdbError> {
        if self.word > MAX_PACKED_WORD_ID {
            return Err(KdbError::WordIdOutOfRange(self.word));
        }
        let rank = u32::from(self.rank.min(15));
        Ok(((rank & 0xF) << 28) | self.word)
    }

    pub fn unpack(packed: u32) -> Self {
        Self {
            word: packed & MAX_PACKED_WORD_ID,
            rank: (packed >> 28) as u8,
        }
    }
}

/// `u16 keywordLen, keyword, u16 refCount, u32[refCount] packed`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BaseRecord<'a> {
    pub keyword: &'a str,
    pub words: Vec<PackedWord>,
}

impl<'a> Record<'a> for BaseRecord<'a> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), KdbError> {
        put_str(out, self.keyword);
        let count = put_count(out, self.words.len());
        for word in &self.words[..count] {
            put_u32(out, word.pack()?);
        }
        Ok(())
    }

    fn decode(bytes: &'a [u8]) -> Result<Self, KdbError> {
        let mut cur = Cursor::new(bytes);
        let keyword = cur.str()?;
        let count = cur.u16()? as usize;
        let words = (0..count)
            .map(|_| cur.u32().map(PackedWord::unpack))
            .collect::<Result<_, _>>()?;
        cur.finish()?;
        Ok(Self { keyword, words })
    }
}

fn put_strings(out: &mut Vec<u8>, items: &[&str]) {
    let count = put_count(out, items.len());
    for item in &items[..count] {
        put_str(out, item);
    }
}

fn read_strings<'a>(cur: &mut Cursor<'a>) -> Result<Vec<&'a str>, KdbError> {
    let count = cur.u16()? as usize;
    (0..count).map(|_| cur.str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_record_preserves_every_field() {
        let word = WordRecord {
            literals: vec!["食べる", "喰べる"],
            readings: vec!["たべる"],
            senses: vec![vec!["to eat"], vec!["to live on", "to subsist"], vec![]],
            categories: vec![3, 17],
            refs: vec![
                RefRecord {
                    sentence: 70_000,
                    start: 5,
                    end: 8,
                },
                RefRecord {
                    sentence: 2,
                    start: 0,
                    end: 3,
                },
            ],
        };
        let mut buf = Vec::new();
        word.encode(&mut buf).unwrap();
        assert_eq!(WordRecord::decode(&buf).unwrap(), word);
    }

    #[test]
    fn word_record_layout_matches_format() {
        let word = WordRecord {
            literals: vec!["猫"],
            readings: vec![],
            senses: vec![vec!["cat"]],
            categories: vec![1],
            refs: vec![RefRecord {
                sentence: 9,
                start: 0,
                end: 1,
            }],
        };
        let mut buf = Vec::new();
        word.encode(&mut buf).unwrap();
        let expected: Vec<u8> = [
            &[1, 0, 3, 0][..],
            "猫".as_bytes(),
            &[0, 0],
            &[1, 0, 1, 0, 3, 0],
            b"cat",
            &[1, 0, 1, 0],
            &[1, 0, 9, 0, 0, 0, 0, 0, 1, 0],
        ]
        .concat();
        assert_eq!(buf, expected);
    }

    #[test]
    fn base_record_packs_rank_into_high_bits() {
        assert_eq!(PackedWord { word: 5, rank: 1 }.pack().unwrap(), 0x1000_0005);
        assert_eq!(PackedWord { word: 5, rank: 40 }.pack().unwrap(), 0xF000_0005);
        assert!(matches!(
            PackedWord {
                word: MAX_PACKED_WORD_ID + 1,
                rank: 0
            }
            .pack(),
            Err(KdbError::WordIdOutOfRange(_))
        ));

        let base = BaseRecord {
            keyword: "cat",
            words: vec![PackedWord { word: 12, rank: 0 }, PackedWord { word: 3, rank: 15 }],
        };
        let mut buf = Vec::new();
        base.encode(&mut buf).unwrap();
        assert_eq!(BaseRecord::decode(&buf).unwrap(), base);
    }

    #[test]
    fn category_and_sentence_records_round_trip() {
        let category = CategoryRecord {
            name: "Japanese-Language Proficiency Test/JLPT N5",
            members: vec![0, 4, 9],
        };
        let mut buf = Vec::new();
        category.encode(&mut buf).unwrap();
        assert_eq!(CategoryRecord::decode(&buf).unwrap(), category);

        let sentence = SentenceRecord {
            reading: "ねこがさかなをたべる。",
            translation: "The cat eats fish.",
        };
        let mut buf = Vec::new();
        sentence.encode(&mut buf).unwrap();
        assert_eq!(SentenceRecord::decode(&buf).unwrap(), sentence);
    }

    #[test]
    fn decode_rejects_trailing_and_truncated_bytes() {
        let mut buf = Vec::new();
        SentenceRecord {
            reading: "a",
            translation: "b",
        }
        .encode(&mut buf)
        .unwrap();

        let mut extra = buf.clone();
        extra.push(0);
        assert!(matches!(
            SentenceRecord::decode(&extra),
            Err(KdbError::TrailingBytes(1))
        ));
        assert!(matches!(
            SentenceRecord::decode(&buf[..buf.len() - 1]),
            Err(KdbError::Truncated { .. })
        ));
    }

    #[test]
    fn oversized_lists_saturate() {
        let refs = vec![
            RefRecord {
                sentence: 1,
                start: 0,
                end: 1
            };
            70_000
        ];
        let word = WordRecord {
            refs,
            ..WordRecord::default()
        };
        let mut buf = Vec::new();
        word.encode(&mut buf).unwrap();
        let decoded = WordRecord::decode(&buf).unwrap();
        assert_eq!(decoded.refs.len(), u16::MAX as usize);
    }
}
