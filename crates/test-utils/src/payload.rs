//! Encoders for synthetic 4wings tile payloads.
//!
//! A payload is a protobuf message with a single packed varint field (field
//! 1) holding consecutive cell records:
//! `[cell_index, start_frame, end_frame, value...]`.

use bytes::Bytes;

/// One cell record with raw (quantized) values.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub cell_index: u64,
    /// Absolute frame of `values[0]`.
    pub start_frame: u64,
    pub values: Vec<u64>,
}

impl CellRecord {
    pub fn new(cell_index: u64, start_frame: u64, values: Vec<u64>) -> Self {
        Self {
            cell_index,
            start_frame,
            values,
        }
    }

    /// Inclusive last frame of the record.
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.values.len().max(1) as u64 - 1
    }

    /// Flatten into the integer stream layout.
    pub fn to_stream(&self) -> Vec<u64> {
        let mut stream = Vec::with_capacity(self.values.len() + 3);
        stream.push(self.cell_index);
        stream.push(self.start_frame);
        stream.push(self.end_frame());
        stream.extend_from_slice(&self.values);
        stream
    }
}

/// Append `value` as a base-128 varint.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Wrap an integer stream as packed field 1.
pub fn encode_stream(stream: &[u64]) -> Vec<u8> {
    let mut packed = Vec::new();
    for value in stream {
        encode_varint(*value, &mut packed);
    }
    let mut buf = Vec::with_capacity(packed.len() + 6);
    buf.push((1 << 3) | 2);
    encode_varint(packed.len() as u64, &mut buf);
    buf.extend_from_slice(&packed);
    buf
}

/// Encode cell records as a payload body.
pub fn encode_cells(records: &[CellRecord]) -> Bytes {
    let stream: Vec<u64> = records.iter().flat_map(CellRecord::to_stream).collect();
    Bytes::from(encode_stream(&stream))
}

/// Quantize a physical value the way tile servers do: `raw = value / scale + offset`.
pub fn quantize(value: f64, scale: f64, offset: f64) -> u64 {
    (value / scale + offset).round().max(0.0) as u64
}
