//! Depth map loading and saving.
//!
//! Depth maps are stored as VTK XML image data (`.vti`) carrying a single
//! `Float64` point-data array named `Depths`, one value per pixel, with an
//! extent of `width x height x 1`. The array may be inline ascii, inline
//! base64 (optionally zlib compressed), or base64 appended data.

use crate::binary::{
    BinaryError, BlockLayout, ByteOrder, Compressor, HeaderType, ZLIB_COMPRESSOR,
};
use crate::types::DepthImage;
use crate::vtk::{self, DataArray, DataSection, ImageDataElement, Piece, VtkFile};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the point-data array holding per-pixel depths.
pub const DEPTHS_ARRAY: &str = "Depths";

/// How rows in the file map onto image rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    /// The first row in the file is the last image row. This is how depth
    /// maps written alongside the camera models are laid out.
    #[default]
    BottomUp,
    /// File rows are image rows.
    TopDown,
}

impl RowOrder {
    /// Image row receiving file row `row` of an image `height` rows tall.
    fn image_row(self, row: usize, height: usize) -> usize {
        match self {
            RowOrder::BottomUp => height - 1 - row,
            RowOrder::TopDown => row,
        }
    }
}

/// Errors decoding a depth map file.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("expected VTK ImageData, found '{0}'")]
    NotImageData(String),

    #[error("invalid extent: {0}")]
    InvalidExtent(String),

    #[error("expected a single depth slice, found {0}")]
    UnexpectedDepth(usize),

    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    #[error("point data array '{0}' not found")]
    MissingArray(String),

    #[error("array '{name}' has element type {found}, expected Float64")]
    WrongElementType { name: String, found: String },

    #[error("array '{name}' has {found} components, expected 1")]
    WrongComponentCount { name: String, found: u32 },

    #[error("array '{name}' uses unsupported '{format}' encoding")]
    UnsupportedEncoding { name: String, format: String },

    #[error("array '{name}' is appended but the file has no AppendedData")]
    MissingAppendedData { name: String },

    #[error("array '{name}' has bad binary data: {source}")]
    Binary {
        name: String,
        #[source]
        source: BinaryError,
    },

    #[error("array '{name}' holds {found} values, expected {expected}")]
    ValueCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("array '{name}' value {index} is not a number: '{token}'")]
    InvalidValue {
        name: String,
        index: usize,
        token: String,
    },
}

/// Errors encoding a depth map file.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::SeError),
}

/// How the writer stores the `Depths` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayEncoding {
    /// Whitespace separated text.
    #[default]
    Ascii,
    /// Inline base64 with a UInt64 byte-count header.
    Binary,
    /// Inline base64 of zlib compressed blocks.
    Compressed,
}

/// Reads depth maps from VTK XML image data.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthMapReader {
    row_order: RowOrder,
}

impl DepthMapReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_order(mut self, row_order: RowOrder) -> Self {
        self.row_order = row_order;
        self
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// Load a depth map from disk. The file is closed before returning.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load(&self, path: &Path) -> Result<DepthImage, DecodeError> {
        debug!("Loading depth map");
        let file = File::open(path)?;
        let image = self.read(BufReader::new(file)).inspect_err(|e| {
            warn!("Failed to decode depth map: {}", e);
        })?;
        debug!("Loaded {}x{} depth map", image.width(), image.height());
        Ok(image)
    }

    /// Decode a depth map from any buffered reader.
    pub fn read<R: BufRead>(&self, reader: R) -> Result<DepthImage, DecodeError> {
        let file: VtkFile = quick_xml::de::from_reader(reader)?;
        self.convert(file)
    }

    /// Decode a depth map from an in-memory document.
    pub fn decode(&self, xml: &str) -> Result<DepthImage, DecodeError> {
        let file: VtkFile = quick_xml::de::from_str(xml)?;
        self.convert(file)
    }

    fn convert(&self, file: VtkFile) -> Result<DepthImage, DecodeError> {
        if file.kind != vtk::IMAGE_DATA {
            return Err(DecodeError::NotImageData(file.kind));
        }
        let image = file
            .image_data
            .as_ref()
            .ok_or_else(|| DecodeError::NotImageData("missing ImageData element".into()))?;

        let [width, height, depth] =
            vtk::parse_extent(&image.whole_extent).map_err(DecodeError::InvalidExtent)?;
        if depth != 1 {
            return Err(DecodeError::UnexpectedDepth(depth));
        }
        let area = width.checked_mul(height).ok_or_else(|| {
            DecodeError::InvalidExtent(format!("{width}x{height} image is too large"))
        })?;

        let piece = match image.pieces.as_slice() {
            [piece] => piece,
            pieces => {
                return Err(DecodeError::UnsupportedLayout(format!(
                    "expected one piece, found {}",
                    pieces.len()
                )));
            }
        };

        let array = piece
            .point_data
            .as_ref()
            .and_then(|pd| pd.array(DEPTHS_ARRAY))
            .ok_or_else(|| DecodeError::MissingArray(DEPTHS_ARRAY.to_string()))?;
        let values = read_depths(array, &file, area)?;

        let mut out = DepthImage::new(width, height);
        for (row, samples) in values.chunks_exact(width.max(1)).enumerate().take(height) {
            let y = self.row_order.image_row(row, height);
            for (x, &value) in samples.iter().enumerate() {
                out.set(x, y, value);
            }
        }
        Ok(out)
    }
}

fn read_depths(
    array: &DataArray,
    file: &VtkFile,
    expected: usize,
) -> Result<Vec<f64>, DecodeError> {
    let name = DEPTHS_ARRAY.to_string();
    if array.data_type != vtk::FLOAT64 {
        return Err(DecodeError::WrongElementType {
            name,
            found: array.data_type.clone(),
        });
    }
    if array.component_count() != 1 {
        return Err(DecodeError::WrongComponentCount {
            name,
            found: array.component_count(),
        });
    }

    let binary_err = |source| DecodeError::Binary {
        name: DEPTHS_ARRAY.to_string(),
        source,
    };
    let values = match array.encoding() {
        vtk::ASCII => vtk::parse_values(&array.text).map_err(|(index, token)| {
            DecodeError::InvalidValue {
                name: name.clone(),
                index,
                token,
            }
        })?,
        vtk::BINARY => {
            let encoded: String = array.text.split_whitespace().collect();
            decode_binary(file, &encoded).map_err(binary_err)?
        }
        vtk::APPENDED => {
            let appended = file
                .appended_data
                .as_ref()
                .ok_or_else(|| DecodeError::MissingAppendedData { name: name.clone() })?;
            if appended.encoding != vtk::BASE64 {
                return Err(DecodeError::UnsupportedEncoding {
                    name,
                    format: format!("appended {}", appended.encoding),
                });
            }
            let offset = array.offset.ok_or_else(|| {
                binary_err(BinaryError::Malformed("appended array has no offset".into()))
            })?;
            let stream = appended.stream();
            let encoded = stream.get(offset..).ok_or_else(|| {
                binary_err(BinaryError::Truncated {
                    needed: offset,
                    available: stream.len(),
                })
            })?;
            decode_binary(file, encoded).map_err(binary_err)?
        }
        other => {
            return Err(DecodeError::UnsupportedEncoding {
                name,
                format: other.to_string(),
            });
        }
    };

    if values.len() != expected {
        return Err(DecodeError::ValueCount {
            name,
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

fn decode_binary(file: &VtkFile, encoded: &str) -> Result<Vec<f64>, BinaryError> {
    let layout = file.block_layout()?;
    let bytes = layout.decode_block(encoded)?;
    layout.f64_values(&bytes)
}

/// Writes depth maps as VTK XML image data.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthMapWriter {
    row_order: RowOrder,
    encoding: ArrayEncoding,
}

impl DepthMapWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_order(mut self, row_order: RowOrder) -> Self {
        self.row_order = row_order;
        self
    }

    pub fn with_encoding(mut self, encoding: ArrayEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Serialize `image` so that a reader with the same row order
    /// reproduces it exactly.
    pub fn encode(&self, image: &DepthImage) -> Result<String, EncodeError> {
        let (width, height) = (image.width(), image.height());
        let mut values = Vec::with_capacity(width * height);
        for row in 0..height {
            values.extend_from_slice(image.row(self.row_order.image_row(row, height)));
        }

        let compressor = match self.encoding {
            ArrayEncoding::Compressed => Compressor::Zlib,
            ArrayEncoding::Ascii | ArrayEncoding::Binary => Compressor::None,
        };
        let layout = BlockLayout {
            header: HeaderType::UInt64,
            order: ByteOrder::LittleEndian,
            compressor,
        };
        let array = match self.encoding {
            ArrayEncoding::Ascii => DataArray::ascii_f64(Some(DEPTHS_ARRAY), 1, &values),
            ArrayEncoding::Binary | ArrayEncoding::Compressed => {
                DataArray::binary_f64(Some(DEPTHS_ARRAY), 1, &values, &layout)?
            }
        };
        let binary = self.encoding != ArrayEncoding::Ascii;

        let extent = vtk::format_extent([width, height, 1]);
        let file = VtkFile {
            kind: vtk::IMAGE_DATA.to_string(),
            version: Some("1.0".to_string()),
            byte_order: Some("LittleEndian".to_string()),
            header_type: binary.then(|| layout.header.name().to_string()),
            compressor: (compressor == Compressor::Zlib).then(|| ZLIB_COMPRESSOR.to_string()),
            image_data: Some(ImageDataElement {
                whole_extent: extent.clone(),
                origin: Some(vtk::format_triple([0.0; 3])),
                spacing: Some(vtk::format_triple([1.0; 3])),
                pieces: vec![Piece {
                    extent,
                    point_data: Some(DataSection {
                        scalars: Some(DEPTHS_ARRAY.to_string()),
                        arrays: vec![array],
                    }),
                    cell_data: None,
                    points: None,
                }],
            }),
            structured_grid: None,
            appended_data: None,
        };

        let body = quick_xml::se::to_string_with_root(vtk::ROOT, &file)?;
        Ok(format!("{}{}\n", vtk::XML_DECLARATION, body))
    }

    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn save(&self, path: &Path, image: &DepthImage) -> Result<(), EncodeError> {
        let xml = self.encode(image)?;
        std::fs::write(path, xml)?;
        debug!("Saved {}x{} depth map", image.width(), image.height());
        Ok(())
    }
}

/// Load a depth map with the default (bottom-up) row order.
pub fn load_depth_map<P: AsRef<Path>>(path: P) -> Result<DepthImage, DecodeError> {
    DepthMapReader::new().load(path.as_ref())
}

/// Save a depth map with the default (bottom-up) row order.
pub fn save_depth_map<P: AsRef<Path>>(path: P, image: &DepthImage) -> Result<(), EncodeError> {
    DepthMapWriter::new().save(path.as_ref(), image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_xml(extent: &str, array: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="0.1" byte_order="LittleEndian">
  <ImageData WholeExtent="{extent}" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="{extent}">
      <PointData Scalars="Depths">
        {array}
      </PointData>
    </Piece>
  </ImageData>
</VTKFile>"#
        )
    }

    #[test]
    fn test_decode_inverts_rows() {
        // 2 wide, 3 tall; file rows are [1 2], [3 4], [5 6].
        let xml = image_xml(
            "0 1 0 2 0 0",
            r#"<DataArray type="Float64" Name="Depths" format="ascii">1 2 3 4 5 6</DataArray>"#,
        );
        let file_rows = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

        let depth = DepthMapReader::new().decode(&xml).unwrap();
        assert_eq!((depth.width(), depth.height()), (2, 3));
        for y in 0..3 {
            for x in 0..2 {
                assert_eq!(depth.at(x, y), file_rows[3 - 1 - y][x]);
            }
        }
    }

    #[test]
    fn test_decode_top_down_keeps_rows() {
        let xml = image_xml(
            "0 1 0 1 0 0",
            r#"<DataArray type="Float64" Name="Depths" format="ascii">1 2 3 4</DataArray>"#,
        );
        let depth = DepthMapReader::new()
            .with_row_order(RowOrder::TopDown)
            .decode(&xml)
            .unwrap();
        assert_eq!(depth.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_decode_picks_depths_among_other_arrays() {
        let xml = image_xml(
            "0 1 0 0 0 0",
            r#"<DataArray type="UInt8" Name="Color" NumberOfComponents="3" format="ascii">1 2 3 4 5 6</DataArray>
               <DataArray type="Float64" Name="Depths" format="ascii">7.5 8.25</DataArray>"#,
        );
        let depth = DepthMapReader::new().decode(&xml).unwrap();
        assert_eq!(depth.as_slice(), &[7.5, 8.25]);
    }

    #[test]
    fn test_decode_missing_array() {
        let xml = image_xml(
            "0 1 0 0 0 0",
            r#"<DataArray type="Float64" Name="Weights" format="ascii">1 2</DataArray>"#,
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(err, DecodeError::MissingArray(ref n) if n == "Depths"));
    }

    #[test]
    fn test_decode_wrong_element_type() {
        let xml = image_xml(
            "0 1 0 0 0 0",
            r#"<DataArray type="Float32" Name="Depths" format="ascii">1 2</DataArray>"#,
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::WrongElementType { ref found, .. } if found == "Float32"
        ));
    }

    #[test]
    fn test_decode_multi_component_rejected() {
        let xml = image_xml(
            "0 0 0 0 0 0",
            r#"<DataArray type="Float64" Name="Depths" NumberOfComponents="2" format="ascii">1 2</DataArray>"#,
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(err, DecodeError::WrongComponentCount { found: 2, .. }));
    }

    #[test]
    fn test_decode_unknown_format_rejected() {
        let xml = image_xml(
            "0 1 0 0 0 0",
            r#"<DataArray type="Float64" Name="Depths" format="hex">00</DataArray>"#,
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnsupportedEncoding { ref format, .. } if format == "hex"
        ));
    }

    #[test]
    fn test_decode_extent_overflow_is_an_error() {
        let array = r#"<DataArray type="Float64" Name="Depths" format="ascii">1</DataArray>"#;
        for extent in ["0 9223372036854775807 0 0 0 0", "0 4294967296 0 4294967296 0 0"] {
            let err = DepthMapReader::new()
                .decode(&image_xml(extent, array))
                .unwrap_err();
            assert!(matches!(err, DecodeError::InvalidExtent(_)), "{extent}: {err}");
        }
    }

    // 1.0 ..= 6.0 in file order, as VTK writes them.
    const BASE64_U32: &str =
        "MAAAAAAAAAAAAPA/AAAAAAAAAEAAAAAAAAAIQAAAAAAAABBAAAAAAAAAFEAAAAAAAAAYQA==";
    const ZLIB_U32: &str =
        "AgAAACAAAAAQAAAAFwAAABIAAAA=eJxjYACBD/YMEOAAoTigtIADACXXAgh4nGNgAAERBzDFIOEAAAOIAK0=";
    // Six 0.5 weights at offset 0, then the depths at offset 72.
    const WEIGHTS_U32: &str =
        "MAAAAAAAAAAAAOA/AAAAAAAA4D8AAAAAAADgPwAAAAAAAOA/AAAAAAAA4D8AAAAAAADgPw==";

    fn binary_xml(root_attrs: &str, arrays: &str, appended: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="1.0" byte_order="LittleEndian" {root_attrs}>
  <ImageData WholeExtent="0 1 0 2 0 0" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="0 1 0 2 0 0">
      <PointData Scalars="Depths">
        {arrays}
      </PointData>
    </Piece>
  </ImageData>
  {appended}
</VTKFile>"#
        )
    }

    fn top_down(xml: &str) -> Vec<f64> {
        DepthMapReader::new()
            .with_row_order(RowOrder::TopDown)
            .decode(xml)
            .unwrap()
            .as_slice()
            .to_vec()
    }

    const FILE_ORDER: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    #[test]
    fn test_decode_inline_base64() {
        let xml = binary_xml(
            r#"header_type="UInt32""#,
            &format!(
                r#"<DataArray type="Float64" Name="Depths" format="binary">
          {BASE64_U32}
        </DataArray>"#
            ),
            "",
        );
        assert_eq!(top_down(&xml), FILE_ORDER);

        // Default row order still flips the file rows.
        let depth = DepthMapReader::new().decode(&xml).unwrap();
        assert_eq!(depth.row(0), &[5.0, 6.0]);
    }

    #[test]
    fn test_decode_inline_zlib() {
        let xml = binary_xml(
            r#"header_type="UInt32" compressor="vtkZLibDataCompressor""#,
            &format!(
                r#"<DataArray type="Float64" Name="Depths" format="binary">{ZLIB_U32}</DataArray>"#
            ),
            "",
        );
        assert_eq!(top_down(&xml), FILE_ORDER);
    }

    #[test]
    fn test_decode_appended_base64_by_offset() {
        let arrays = r#"<DataArray type="Float64" Name="Weights" format="appended" offset="0"/>
        <DataArray type="Float64" Name="Depths" format="appended" offset="72"/>"#;
        let xml = binary_xml(
            r#"header_type="UInt32""#,
            arrays,
            &format!(
                r#"<AppendedData encoding="base64">
   _{WEIGHTS_U32}{BASE64_U32}
  </AppendedData>"#
            ),
        );
        assert_eq!(top_down(&xml), FILE_ORDER);
    }

    #[test]
    fn test_decode_appended_zlib_by_offset() {
        let arrays = r#"<DataArray type="Float64" Name="Depths" format="appended" offset="72"/>"#;
        let xml = binary_xml(
            r#"header_type="UInt32" compressor="vtkZLibDataCompressor""#,
            arrays,
            &format!(r#"<AppendedData encoding="base64">_{WEIGHTS_U32}{ZLIB_U32}</AppendedData>"#),
        );
        assert_eq!(top_down(&xml), FILE_ORDER);
    }

    #[test]
    fn test_decode_appended_without_section() {
        let arrays = r#"<DataArray type="Float64" Name="Depths" format="appended" offset="0"/>"#;
        let err = DepthMapReader::new()
            .decode(&binary_xml("", arrays, ""))
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingAppendedData { .. }));
    }

    #[test]
    fn test_decode_raw_appended_rejected() {
        let arrays = r#"<DataArray type="Float64" Name="Depths" format="appended" offset="0"/>"#;
        let xml = binary_xml("", arrays, r#"<AppendedData encoding="raw">_</AppendedData>"#);
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedEncoding { .. }));
    }

    #[test]
    fn test_decode_corrupt_base64() {
        let xml = binary_xml(
            "",
            r#"<DataArray type="Float64" Name="Depths" format="binary">@@@@@@@@</DataArray>"#,
            "",
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Binary {
                source: BinaryError::Base64(_),
                ..
            }
        ));
    }

    #[test]
    fn test_decode_binary_value_count_checked() {
        // Six values against a 2x2 extent.
        let xml = binary_xml(
            "",
            &format!(
                r#"<DataArray type="Float64" Name="Depths" format="binary">{BASE64_U32}</DataArray>"#
            ),
            "",
        )
        .replace("0 1 0 2 0 0", "0 1 0 1 0 0");
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ValueCount {
                expected: 4,
                found: 6,
                ..
            }
        ));
    }

    #[test]
    fn test_binary_encodings_round_trip() {
        let image =
            DepthImage::from_vec(3, 2, vec![0.5, -1.25, 2.0, 1e-9, 42.0, f64::MAX]).unwrap();
        for encoding in [ArrayEncoding::Binary, ArrayEncoding::Compressed] {
            let xml = DepthMapWriter::new()
                .with_encoding(encoding)
                .encode(&image)
                .unwrap();
            assert!(xml.contains(r#"header_type="UInt64""#));
            assert_eq!(xml.contains(ZLIB_COMPRESSOR), encoding == ArrayEncoding::Compressed);
            assert_eq!(DepthMapReader::new().decode(&xml).unwrap(), image);
        }
    }

    #[test]
    fn test_decode_value_count_mismatch() {
        let xml = image_xml(
            "0 1 0 1 0 0",
            r#"<DataArray type="Float64" Name="Depths" format="ascii">1 2 3</DataArray>"#,
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ValueCount {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_bad_token() {
        let xml = image_xml(
            "0 1 0 0 0 0",
            r#"<DataArray type="Float64" Name="Depths" format="ascii">1 nope</DataArray>"#,
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { index: 1, .. }));
    }

    #[test]
    fn test_decode_rejects_volume() {
        let xml = image_xml(
            "0 1 0 0 0 1",
            r#"<DataArray type="Float64" Name="Depths" format="ascii">1 2 3 4</DataArray>"#,
        );
        let err = DepthMapReader::new().decode(&xml).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedDepth(2)));
    }

    #[test]
    fn test_decode_rejects_other_dataset_types() {
        let xml = r#"<VTKFile type="PolyData" version="0.1"></VTKFile>"#;
        let err = DepthMapReader::new().decode(xml).unwrap_err();
        assert!(matches!(err, DecodeError::NotImageData(ref k) if k == "PolyData"));
    }

    #[test]
    fn test_encode_then_decode_restores_image() {
        let image = DepthImage::from_vec(2, 3, vec![0.5, 1.25, 2.0, -3.5, 1e-9, 42.0]).unwrap();
        for order in [RowOrder::BottomUp, RowOrder::TopDown] {
            let xml = DepthMapWriter::new()
                .with_row_order(order)
                .encode(&image)
                .unwrap();
            let back = DepthMapReader::new()
                .with_row_order(order)
                .decode(&xml)
                .unwrap();
            assert_eq!(back, image);
        }
    }

    #[test]
    fn test_encode_writes_file_rows_bottom_up() {
        let image = DepthImage::from_vec(1, 2, vec![10.0, 20.0]).unwrap();
        let xml = DepthMapWriter::new().encode(&image).unwrap();
        let top_down = DepthMapReader::new()
            .with_row_order(RowOrder::TopDown)
            .decode(&xml)
            .unwrap();
        assert_eq!(top_down.as_slice(), &[20.0, 10.0]);
    }

    #[test]
    fn test_save_and_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0001.vti");
        let image = DepthImage::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        save_depth_map(&path, &image).unwrap();
        let loaded = load_depth_map(&path).unwrap();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_depth_map("/nonexistent/depth.vti").unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }
}
