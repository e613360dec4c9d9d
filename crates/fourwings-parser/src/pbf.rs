//! Minimal protobuf reader for packed varint payloads.
//!
//! Only what the 4wings format needs: tags, varints and length-delimited
//! fields. Fixed-width fields are skipped.

use crate::error::{ParseError, ParseResult};

/// Field number carrying the packed cell stream.
pub const CELLS_FIELD: u32 = 1;

/// Protobuf wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u8, position: usize) -> ParseResult<Self> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(ParseError::UnsupportedWireType {
                wire_type: other,
                position,
            }),
        }
    }
}

/// Cursor over a protobuf-encoded buffer.
pub struct PbfReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PbfReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read one base-128 varint.
    pub fn read_varint(&mut self) -> ParseResult<u64> {
        let start = self.pos;
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(ParseError::TruncatedVarint(start))?;
            self.pos += 1;
            value |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ParseError::VarintOverflow(start))
    }

    /// Read the next field tag, or `None` at end of buffer.
    pub fn read_tag(&mut self) -> ParseResult<Option<(u32, WireType)>> {
        if self.is_empty() {
            return Ok(None);
        }
        let position = self.pos;
        let tag = self.read_varint()?;
        let wire_type = WireType::from_bits((tag & 0x7) as u8, position)?;
        Ok(Some(((tag >> 3) as u32, wire_type)))
    }

    fn read_length_delimited(&mut self) -> ParseResult<&'a [u8]> {
        let length = self.read_varint()? as usize;
        let remaining = self.buf.len() - self.pos;
        if length > remaining {
            return Err(ParseError::TruncatedField { length, remaining });
        }
        let bytes = &self.buf[self.pos..self.pos + length];
        self.pos += length;
        Ok(bytes)
    }

    fn skip_bytes(&mut self, count: usize) -> ParseResult<()> {
        let remaining = self.buf.len() - self.pos;
        if count > remaining {
            return Err(ParseError::TruncatedField {
                length: count,
                remaining,
            });
        }
        self.pos += count;
        Ok(())
    }

    /// Skip a field value of the given wire type.
    pub fn skip(&mut self, wire_type: WireType) -> ParseResult<()> {
        match wire_type {
            WireType::Varint => self.read_varint().map(|_| ()),
            WireType::Fixed64 => self.skip_bytes(8),
            WireType::Fixed32 => self.skip_bytes(4),
            WireType::LengthDelimited => self.read_length_delimited().map(|_| ()),
        }
    }
}

/// Collect every varint of `field` in `buf`, accepting both packed and
/// unpacked encodings. Other fields are skipped.
pub fn read_packed_varints(buf: &[u8], field: u32) -> ParseResult<Vec<u64>> {
    let mut reader = PbfReader::new(buf);
    let mut values = Vec::new();

    while let Some((number, wire_type)) = reader.read_tag()? {
        match (number == field, wire_type) {
            (true, WireType::LengthDelimited) => {
                let packed = reader.read_length_delimited()?;
                let mut inner = PbfReader::new(packed);
                while !inner.is_empty() {
                    values.push(inner.read_varint()?);
                }
            }
            (true, WireType::Varint) => values.push(reader.read_varint()?),
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    Ok(values)
}
