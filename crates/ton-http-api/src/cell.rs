//! Cell objects and bag-of-cells bytes.
//!
//! The `*Simple` methods accept cells written as JSON objects:
//!
//! ```json
//! {"data": {"b64": "AAAABQ==", "len": 32}, "refs": []}
//! ```
//!
//! [`BocCodec`] serializes such a tree into the bag-of-cells format the
//! client expects, and reads the data bits of a bag's root cell.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
const MAX_DATA_BITS: usize = 1023;
const MAX_REFS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("invalid cell object: {0}")]
    Shape(String),
    #[error("cell data is not valid base64")]
    Base64,
    #[error("cell data holds {available} bits, {declared} declared")]
    DataTooShort { declared: usize, available: usize },
    #[error("cell data length {0} exceeds 1023 bits")]
    TooManyBits(usize),
    #[error("cell has {0} references, at most 4 allowed")]
    TooManyRefs(usize),
    #[error("not a bag of cells")]
    BadMagic,
    #[error("bag of cells is truncated")]
    Truncated,
    #[error("bag of cells has no root")]
    NoRoot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CellData {
    pub b64: String,
    pub len: usize,
}

/// One node of a cell tree as written by callers
#[derive(Debug, Clone, Deserialize)]
pub struct CellObject {
    pub data: CellData,
    #[serde(default)]
    pub refs: Vec<CellObject>,
}

/// Converts between cell objects and bag-of-cells bytes
pub trait CellCodec: Send + Sync {
    /// Serialize a cell object into a single-root bag of cells
    fn serialize_boc(&self, cell: &Value) -> Result<Vec<u8>, CellError>;

    /// Data bytes of the root cell of a bag of cells
    fn root_cell_data(&self, boc: &[u8]) -> Result<Vec<u8>, CellError>;
}

/// Codec for ordinary cells: no index, no checksum, no deduplication.
#[derive(Debug, Clone, Copy, Default)]
pub struct BocCodec;

// Cell flattened for serialization; refs are indices into the cell list.
struct FlatCell {
    bits: usize,
    data: Vec<u8>,
    refs: Vec<usize>,
}

impl FlatCell {
    fn from_object(cell: &CellObject) -> Result<Self, CellError> {
        let bits = cell.data.len;
        if bits > MAX_DATA_BITS {
            return Err(CellError::TooManyBits(bits));
        }
        if cell.refs.len() > MAX_REFS {
            return Err(CellError::TooManyRefs(cell.refs.len()));
        }

        let raw = STANDARD
            .decode(cell.data.b64.trim())
            .map_err(|_| CellError::Base64)?;
        let byte_len = bits.div_ceil(8);
        if raw.len() < byte_len {
            return Err(CellError::DataTooShort {
                declared: bits,
                available: raw.len() * 8,
            });
        }

        let mut data = raw[..byte_len].to_vec();
        let tail_bits = bits % 8;
        if tail_bits != 0
            && let Some(last) = data.last_mut()
        {
            let keep = 0xffu8 << (8 - tail_bits);
            *last = (*last & keep) | (0x80 >> tail_bits);
        }

        Ok(Self {
            bits,
            data,
            refs: Vec::new(),
        })
    }

    fn descriptors(&self) -> [u8; 2] {
        let d1 = self.refs.len() as u8;
        let d2 = (self.bits / 8 + self.bits.div_ceil(8)) as u8;
        [d1, d2]
    }

    fn serialized_len(&self, ref_size: usize) -> usize {
        2 + self.data.len() + self.refs.len() * ref_size
    }
}

// Pre-order walk: every reference points to a later cell.
fn flatten(cell: &CellObject, cells: &mut Vec<FlatCell>) -> Result<usize, CellError> {
    let index = cells.len();
    cells.push(FlatCell::from_object(cell)?);

    let mut refs = Vec::with_capacity(cell.refs.len());
    for child in &cell.refs {
        refs.push(flatten(child, cells)?);
    }
    cells[index].refs = refs;
    Ok(index)
}

fn bytes_needed(value: usize) -> usize {
    let mut size = 1;
    while size < 8 && value >> (size * 8) != 0 {
        size += 1;
    }
    size
}

fn push_be(out: &mut Vec<u8>, value: usize, size: usize) {
    let bytes = (value as u64).to_be_bytes();
    out.extend_from_slice(&bytes[8 - size..]);
}

impl CellCodec for BocCodec {
    fn serialize_boc(&self, cell: &Value) -> Result<Vec<u8>, CellError> {
        let root = CellObject::deserialize(cell).map_err(|e| CellError::Shape(e.to_string()))?;

        let mut cells = Vec::new();
        flatten(&root, &mut cells)?;

        let ref_size = bytes_needed(cells.len());
        let total: usize = cells.iter().map(|c| c.serialized_len(ref_size)).sum();
        let offset_size = bytes_needed(total);

        let mut out = Vec::with_capacity(6 + 4 * ref_size + offset_size + total);
        out.extend_from_slice(&BOC_MAGIC);
        out.push(ref_size as u8);
        out.push(offset_size as u8);
        push_be(&mut out, cells.len(), ref_size);
        push_be(&mut out, 1, ref_size); // roots
        push_be(&mut out, 0, ref_size); // absent
        push_be(&mut out, total, offset_size);
        push_be(&mut out, 0, ref_size); // root index

        for cell in &cells {
            out.extend_from_slice(&cell.descriptors());
            out.extend_from_slice(&cell.data);
            for &child in &cell.refs {
                push_be(&mut out, child, ref_size);
            }
        }
        Ok(out)
    }

    fn root_cell_data(&self, boc: &[u8]) -> Result<Vec<u8>, CellError> {
        let mut reader = Reader { bytes: boc, pos: 0 };
        if reader.take(4)? != BOC_MAGIC {
            return Err(CellError::BadMagic);
        }

        let flags = reader.byte()?;
        let has_index = flags & 0x80 != 0;
        let ref_size = (flags & 0x07) as usize;
        let offset_size = reader.byte()? as usize;
        if ref_size == 0 || ref_size > 4 || offset_size == 0 || offset_size > 8 {
            return Err(CellError::BadMagic);
        }

        let cell_count = reader.uint(ref_size)?;
        let root_count = reader.uint(ref_size)?;
        let _absent = reader.uint(ref_size)?;
        let _total = reader.uint(offset_size)?;
        if root_count == 0 {
            return Err(CellError::NoRoot);
        }
        let root = reader.uint(ref_size)?;
        reader.take((root_count - 1) * ref_size)?;
        if has_index {
            reader.take(cell_count * offset_size)?;
        }
        if root >= cell_count {
            return Err(CellError::NoRoot);
        }

        for index in 0..cell_count {
            let d1 = reader.byte()?;
            let d2 = reader.byte()? as usize;
            let refs = (d1 & 0x07) as usize;
            if d1 & 0x10 != 0 {
                let hashes = (d1 >> 5).count_ones() as usize + 1;
                reader.take(hashes * (32 + 2))?;
            }
            let data = reader.take(d2.div_ceil(2))?;
            reader.take(refs * ref_size)?;
            if index == root {
                return Ok(data.to_vec());
            }
        }
        Err(CellError::NoRoot)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CellError> {
        let end = self.pos.checked_add(len).ok_or(CellError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(CellError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, CellError> {
        Ok(self.take(1)?[0])
    }

    fn uint(&mut self, size: usize) -> Result<usize, CellError> {
        Ok(self
            .take(size)?
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize))
    }
}
