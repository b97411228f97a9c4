//! Base64 binary blocks as written by VTK's XML writers.
//!
//! An uncompressed block is one base64 stream holding a byte-count header
//! word followed by the payload. A compressed block is two streams: the
//! header `[nblocks, block_size, last_block_size, compressed_size...]`
//! encoded on its own, then the concatenated zlib blocks. A
//! `last_block_size` of 0 means the last block is full.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{ErrorKind, Read, Write};
use thiserror::Error;

pub(crate) const ZLIB_COMPRESSOR: &str = "vtkZLibDataCompressor";

/// Uncompressed size of each zlib block on write.
const BLOCK_SIZE: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("zlib inflate failed: {0}")]
    Inflate(#[source] std::io::Error),

    #[error("truncated block: need {needed} encoded characters, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unsupported header type '{0}'")]
    UnsupportedHeaderType(String),

    #[error("unsupported byte order '{0}'")]
    UnsupportedByteOrder(String),

    #[error("unsupported compressor '{0}'")]
    UnsupportedCompressor(String),

    #[error("malformed block: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderType {
    UInt32,
    UInt64,
}

impl HeaderType {
    pub fn name(self) -> &'static str {
        match self {
            HeaderType::UInt32 => "UInt32",
            HeaderType::UInt64 => "UInt64",
        }
    }

    fn size(self) -> usize {
        match self {
            HeaderType::UInt32 => 4,
            HeaderType::UInt64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compressor {
    None,
    Zlib,
}

/// How binary blocks in one file are framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockLayout {
    pub header: HeaderType,
    pub order: ByteOrder,
    pub compressor: Compressor,
}

impl BlockLayout {
    /// Layout from the `VTKFile` attributes. Absent attributes take VTK's
    /// defaults: UInt32 headers, little endian, no compression.
    pub fn from_attributes(
        header_type: Option<&str>,
        byte_order: Option<&str>,
        compressor: Option<&str>,
    ) -> Result<Self, BinaryError> {
        let header = match header_type {
            None | Some("UInt32") => HeaderType::UInt32,
            Some("UInt64") => HeaderType::UInt64,
            Some(other) => return Err(BinaryError::UnsupportedHeaderType(other.to_string())),
        };
        let order = match byte_order {
            None | Some("LittleEndian") => ByteOrder::LittleEndian,
            Some("BigEndian") => ByteOrder::BigEndian,
            Some(other) => return Err(BinaryError::UnsupportedByteOrder(other.to_string())),
        };
        let compressor = match compressor {
            None | Some("") => Compressor::None,
            Some(ZLIB_COMPRESSOR) => Compressor::Zlib,
            Some(other) => return Err(BinaryError::UnsupportedCompressor(other.to_string())),
        };
        Ok(Self {
            header,
            order,
            compressor,
        })
    }

    fn read_word(&self, mut bytes: &[u8]) -> Result<usize, BinaryError> {
        let value = match (self.header, self.order) {
            (HeaderType::UInt32, ByteOrder::LittleEndian) => {
                bytes.read_u32::<LittleEndian>().map(u64::from)
            }
            (HeaderType::UInt32, ByteOrder::BigEndian) => {
                bytes.read_u32::<BigEndian>().map(u64::from)
            }
            (HeaderType::UInt64, ByteOrder::LittleEndian) => bytes.read_u64::<LittleEndian>(),
            (HeaderType::UInt64, ByteOrder::BigEndian) => bytes.read_u64::<BigEndian>(),
        }
        .map_err(|_| BinaryError::Malformed("short header word".into()))?;
        usize::try_from(value)
            .map_err(|_| BinaryError::Malformed(format!("header value {value} is too large")))
    }

    fn write_word(&self, out: &mut Vec<u8>, value: usize) -> std::io::Result<()> {
        let too_large = |_| std::io::Error::new(ErrorKind::InvalidInput, "block too large");
        match self.header {
            HeaderType::UInt32 => {
                let value = u32::try_from(value).map_err(too_large)?;
                match self.order {
                    ByteOrder::LittleEndian => out.write_u32::<LittleEndian>(value),
                    ByteOrder::BigEndian => out.write_u32::<BigEndian>(value),
                }
            }
            HeaderType::UInt64 => {
                let value = u64::try_from(value).map_err(too_large)?;
                match self.order {
                    ByteOrder::LittleEndian => out.write_u64::<LittleEndian>(value),
                    ByteOrder::BigEndian => out.write_u64::<BigEndian>(value),
                }
            }
        }
    }

    /// Decode the block at the start of `encoded`, returning its payload.
    ///
    /// Characters after the block are ignored, so `encoded` may run on into
    /// the next array of an appended section.
    pub fn decode_block(&self, encoded: &str) -> Result<Vec<u8>, BinaryError> {
        let h = self.header.size();
        match self.compressor {
            Compressor::None => {
                let head = decode_prefix(encoded, h)?;
                let len = self.read_word(&head[..h])?;
                let total = h
                    .checked_add(len)
                    .ok_or_else(|| BinaryError::Malformed(format!("payload of {len} bytes")))?;
                let mut bytes = decode_prefix(encoded, total)?;
                bytes.truncate(total);
                Ok(bytes.split_off(h))
            }
            Compressor::Zlib => {
                let first = decode_prefix(encoded, 3 * h)?;
                let nblocks = self.read_word(&first[..h])?;
                let header_len = nblocks
                    .checked_add(3)
                    .and_then(|n| n.checked_mul(h))
                    .ok_or_else(|| BinaryError::Malformed(format!("{nblocks} blocks")))?;
                let header_chars = encoded_len(header_len)?;
                let header = decode_prefix(encoded, header_len)?;

                let words = header[..header_len]
                    .chunks_exact(h)
                    .map(|w| self.read_word(w))
                    .collect::<Result<Vec<_>, _>>()?;
                let (block_size, last_size) = (words[1], words[2]);
                let compressed = &words[3..];
                let compressed_total = compressed.iter().try_fold(0usize, |acc, &n| {
                    acc.checked_add(n)
                        .ok_or_else(|| BinaryError::Malformed("compressed sizes overflow".into()))
                })?;

                let rest = encoded.get(header_chars..).unwrap_or("");
                let mut data = decode_prefix(rest, compressed_total)?;
                data.truncate(compressed_total);

                let expected = uncompressed_len(nblocks, block_size, last_size)?;
                // Sizes come from the file; let the inflater grow the buffer.
                let mut out = Vec::new();
                let mut start = 0;
                for &size in compressed {
                    let mut inflater = ZlibDecoder::new(&data[start..start + size]);
                    inflater
                        .read_to_end(&mut out)
                        .map_err(BinaryError::Inflate)?;
                    start += size;
                }
                if out.len() != expected {
                    return Err(BinaryError::Malformed(format!(
                        "inflated {} bytes, header declares {expected}",
                        out.len()
                    )));
                }
                Ok(out)
            }
        }
    }

    /// Encode `payload` as one inline block.
    pub fn encode_block(&self, payload: &[u8]) -> std::io::Result<String> {
        match self.compressor {
            Compressor::None => {
                let mut bytes = Vec::with_capacity(self.header.size() + payload.len());
                self.write_word(&mut bytes, payload.len())?;
                bytes.extend_from_slice(payload);
                Ok(STANDARD.encode(bytes))
            }
            Compressor::Zlib => {
                let mut blocks = Vec::new();
                for chunk in payload.chunks(BLOCK_SIZE) {
                    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(chunk)?;
                    blocks.push(encoder.finish()?);
                }
                let last_size = payload.len() % BLOCK_SIZE;

                let mut header = Vec::new();
                self.write_word(&mut header, blocks.len())?;
                self.write_word(&mut header, BLOCK_SIZE)?;
                self.write_word(&mut header, last_size)?;
                for block in &blocks {
                    self.write_word(&mut header, block.len())?;
                }
                Ok(STANDARD.encode(header) + &STANDARD.encode(blocks.concat()))
            }
        }
    }

    /// Interpret `bytes` as packed 8-byte floats.
    pub fn f64_values(&self, bytes: &[u8]) -> Result<Vec<f64>, BinaryError> {
        if bytes.len() % 8 != 0 {
            return Err(BinaryError::Malformed(format!(
                "{} bytes is not a whole number of Float64 values",
                bytes.len()
            )));
        }
        let mut values = vec![0.0; bytes.len() / 8];
        let mut reader = bytes;
        match self.order {
            ByteOrder::LittleEndian => reader.read_f64_into::<LittleEndian>(&mut values),
            ByteOrder::BigEndian => reader.read_f64_into::<BigEndian>(&mut values),
        }
        .map_err(|e| BinaryError::Malformed(e.to_string()))?;
        Ok(values)
    }

    pub fn f64_bytes(&self, values: &[f64]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(values.len() * 8);
        for &value in values {
            match self.order {
                ByteOrder::LittleEndian => out.write_f64::<LittleEndian>(value)?,
                ByteOrder::BigEndian => out.write_f64::<BigEndian>(value)?,
            }
        }
        Ok(out)
    }
}

fn encoded_len(bytes: usize) -> Result<usize, BinaryError> {
    bytes
        .div_ceil(3)
        .checked_mul(4)
        .ok_or_else(|| BinaryError::Malformed(format!("{bytes} byte block")))
}

/// Decode at least the first `bytes` bytes of a base64 stream.
fn decode_prefix(encoded: &str, bytes: usize) -> Result<Vec<u8>, BinaryError> {
    let needed = encoded_len(bytes)?;
    let chars = encoded.get(..needed).ok_or(BinaryError::Truncated {
        needed,
        available: encoded.len(),
    })?;
    let decoded = STANDARD.decode(chars)?;
    if decoded.len() < bytes {
        return Err(BinaryError::Malformed(format!(
            "expected {bytes} bytes, stream ends after {}",
            decoded.len()
        )));
    }
    Ok(decoded)
}

fn uncompressed_len(
    nblocks: usize,
    block_size: usize,
    last_size: usize,
) -> Result<usize, BinaryError> {
    if nblocks == 0 {
        return Ok(0);
    }
    let last = if last_size == 0 { block_size } else { last_size };
    (nblocks - 1)
        .checked_mul(block_size)
        .and_then(|n| n.checked_add(last))
        .ok_or_else(|| BinaryError::Malformed("uncompressed size overflows".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1.0 ..= 6.0 as little-endian Float64, UInt32 header.
    const RAW_U32: &str =
        "MAAAAAAAAAAAAPA/AAAAAAAAAEAAAAAAAAAIQAAAAAAAABBAAAAAAAAAFEAAAAAAAAAYQA==";
    // Same values, UInt64 header.
    const RAW_U64: &str =
        "MAAAAAAAAAAAAAAAAADwPwAAAAAAAABAAAAAAAAACEAAAAAAAAAQQAAAAAAAABRAAAAAAAAAGEA=";
    // Same values, big endian, UInt32 header.
    const RAW_BE: &str =
        "AAAAMD/wAAAAAAAAQAAAAAAAAABACAAAAAAAAEAQAAAAAAAAQBQAAAAAAABAGAAAAAAAAA==";
    // Same values, zlib in two 32-byte blocks (last one partial), UInt32 header.
    const ZLIB_U32: &str =
        "AgAAACAAAAAQAAAAFwAAABIAAAA=eJxjYACBD/YMEOAAoTigtIADACXXAgh4nGNgAAERBzDFIOEAAAOIAK0=";

    fn layout(header: &str, order: &str, compressor: Option<&str>) -> BlockLayout {
        BlockLayout::from_attributes(Some(header), Some(order), compressor).unwrap()
    }

    fn values(layout: BlockLayout, encoded: &str) -> Vec<f64> {
        let bytes = layout.decode_block(encoded).unwrap();
        layout.f64_values(&bytes).unwrap()
    }

    const EXPECTED: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    #[test]
    fn test_decode_uncompressed_header_widths() {
        assert_eq!(values(layout("UInt32", "LittleEndian", None), RAW_U32), EXPECTED);
        assert_eq!(values(layout("UInt64", "LittleEndian", None), RAW_U64), EXPECTED);
        assert_eq!(values(layout("UInt32", "BigEndian", None), RAW_BE), EXPECTED);
    }

    #[test]
    fn test_decode_zlib_blocks() {
        let zlib = layout("UInt32", "LittleEndian", Some(ZLIB_COMPRESSOR));
        assert_eq!(values(zlib, ZLIB_U32), EXPECTED);
    }

    #[test]
    fn test_decode_ignores_trailing_stream() {
        let raw = layout("UInt32", "LittleEndian", None);
        let joined = format!("{RAW_U32}{RAW_U32}");
        assert_eq!(values(raw, &joined), EXPECTED);

        let zlib = layout("UInt32", "LittleEndian", Some(ZLIB_COMPRESSOR));
        let joined = format!("{ZLIB_U32}{RAW_U32}");
        assert_eq!(values(zlib, &joined), EXPECTED);
    }

    #[test]
    fn test_decode_truncated_block() {
        let raw = layout("UInt32", "LittleEndian", None);
        let err = raw.decode_block(&RAW_U32[..40]).unwrap_err();
        assert!(matches!(err, BinaryError::Truncated { .. }));
    }

    #[test]
    fn test_decode_header_claiming_huge_payload() {
        // Header word 0xFFFFFFFF with no payload behind it.
        let raw = layout("UInt32", "LittleEndian", None);
        let err = raw.decode_block("/////w==").unwrap_err();
        assert!(matches!(err, BinaryError::Truncated { .. }));
    }

    #[test]
    fn test_unknown_attributes_rejected() {
        assert!(matches!(
            BlockLayout::from_attributes(Some("Int16"), None, None),
            Err(BinaryError::UnsupportedHeaderType(_))
        ));
        assert!(matches!(
            BlockLayout::from_attributes(None, None, Some("vtkLZ4DataCompressor")),
            Err(BinaryError::UnsupportedCompressor(_))
        ));
    }

    #[test]
    fn test_encode_matches_reference_stream() {
        let raw = layout("UInt32", "LittleEndian", None);
        let bytes = raw.f64_bytes(&EXPECTED).unwrap();
        assert_eq!(raw.encode_block(&bytes).unwrap(), RAW_U32);
    }

    #[test]
    fn test_encode_zlib_spans_blocks() {
        let zlib = layout("UInt64", "LittleEndian", Some(ZLIB_COMPRESSOR));
        let values: Vec<f64> = (0..10_000).map(f64::from).collect();
        let encoded = zlib.encode_block(&zlib.f64_bytes(&values).unwrap()).unwrap();
        let bytes = zlib.decode_block(&encoded).unwrap();
        assert_eq!(zlib.f64_values(&bytes).unwrap(), values);
    }
}
