//! Serde model of the VTK XML file format.
//!
//! Only the subset needed for image data (`.vti`) and structured grids
//! (`.vts`) is modelled: inline ascii or base64 arrays, and base64
//! appended data. Unknown attributes and elements are ignored on read.

use crate::binary::{BinaryError, BlockLayout};
use serde::{Deserialize, Serialize};

pub(crate) const XML_DECLARATION: &str = "<?xml version=\"1.0\"?>\n";
pub(crate) const ROOT: &str = "VTKFile";

pub(crate) const IMAGE_DATA: &str = "ImageData";
pub(crate) const STRUCTURED_GRID: &str = "StructuredGrid";
pub(crate) const FLOAT64: &str = "Float64";
pub(crate) const ASCII: &str = "ascii";
pub(crate) const BINARY: &str = "binary";
pub(crate) const APPENDED: &str = "appended";
pub(crate) const BASE64: &str = "base64";

// Attributes (`@`) must precede child elements for the serializer.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VtkFile {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        rename = "@byte_order",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub byte_order: Option<String>,
    #[serde(
        rename = "@header_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub header_type: Option<String>,
    #[serde(
        rename = "@compressor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub compressor: Option<String>,
    #[serde(rename = "ImageData", default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<ImageDataElement>,
    #[serde(
        rename = "StructuredGrid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_grid: Option<StructuredGridElement>,
    #[serde(
        rename = "AppendedData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub appended_data: Option<AppendedData>,
}

impl VtkFile {
    /// Binary block framing declared by the root attributes.
    pub fn block_layout(&self) -> Result<BlockLayout, BinaryError> {
        BlockLayout::from_attributes(
            self.header_type.as_deref(),
            self.byte_order.as_deref(),
            self.compressor.as_deref(),
        )
    }
}

/// Data referenced by `format="appended"` arrays.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AppendedData {
    #[serde(rename = "@encoding")]
    pub encoding: String,
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl AppendedData {
    /// The encoded stream that array offsets index into.
    pub fn stream(&self) -> &str {
        let text = self.text.trim();
        text.strip_prefix('_').unwrap_or(text)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ImageDataElement {
    #[serde(rename = "@WholeExtent")]
    pub whole_extent: String,
    #[serde(rename = "@Origin", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(rename = "@Spacing", default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<String>,
    #[serde(rename = "Piece", default)]
    pub pieces: Vec<Piece>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StructuredGridElement {
    #[serde(rename = "@WholeExtent")]
    pub whole_extent: String,
    #[serde(rename = "Piece", default)]
    pub pieces: Vec<Piece>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Piece {
    #[serde(rename = "@Extent")]
    pub extent: String,
    #[serde(rename = "PointData", default, skip_serializing_if = "Option::is_none")]
    pub point_data: Option<DataSection>,
    #[serde(rename = "CellData", default, skip_serializing_if = "Option::is_none")]
    pub cell_data: Option<DataSection>,
    #[serde(rename = "Points", default, skip_serializing_if = "Option::is_none")]
    pub points: Option<PointsSection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct DataSection {
    #[serde(rename = "@Scalars", default, skip_serializing_if = "Option::is_none")]
    pub scalars: Option<String>,
    #[serde(rename = "DataArray", default)]
    pub arrays: Vec<DataArray>,
}

impl DataSection {
    pub fn array(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PointsSection {
    #[serde(rename = "DataArray")]
    pub array: DataArray,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DataArray {
    #[serde(rename = "@type")]
    pub data_type: String,
    #[serde(rename = "@Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "@NumberOfComponents",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub components: Option<u32>,
    #[serde(rename = "@format", default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "@offset", default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl DataArray {
    /// An inline ascii `Float64` array.
    pub fn ascii_f64(name: Option<&str>, components: u32, values: &[f64]) -> Self {
        Self {
            data_type: FLOAT64.to_string(),
            name: name.map(str::to_string),
            components: Some(components),
            format: Some(ASCII.to_string()),
            offset: None,
            text: format_values(values),
        }
    }

    /// An inline base64 `Float64` array.
    pub fn binary_f64(
        name: Option<&str>,
        components: u32,
        values: &[f64],
        layout: &BlockLayout,
    ) -> std::io::Result<Self> {
        Ok(Self {
            data_type: FLOAT64.to_string(),
            name: name.map(str::to_string),
            components: Some(components),
            format: Some(BINARY.to_string()),
            offset: None,
            text: layout.encode_block(&layout.f64_bytes(values)?)?,
        })
    }

    /// Component count, defaulting to 1 as VTK does.
    pub fn component_count(&self) -> u32 {
        self.components.unwrap_or(1)
    }

    /// Encoding, defaulting to ascii when the attribute is absent.
    pub fn encoding(&self) -> &str {
        self.format.as_deref().unwrap_or(ASCII)
    }
}

/// Parse `x0 x1 y0 y1 z0 z1` into per-axis point counts.
pub(crate) fn parse_extent(extent: &str) -> Result<[usize; 3], String> {
    let bounds: Vec<i64> = extent
        .split_whitespace()
        .map(|t| t.parse().map_err(|_| format!("bad extent token '{t}'")))
        .collect::<Result<_, _>>()?;
    if bounds.len() != 6 {
        return Err(format!("expected 6 extent values, got {}", bounds.len()));
    }

    let mut dims = [0usize; 3];
    for axis in 0..3 {
        let (lo, hi) = (bounds[2 * axis], bounds[2 * axis + 1]);
        let count = hi
            .checked_sub(lo)
            .and_then(|d| d.checked_add(1))
            .ok_or_else(|| format!("extent overflows on axis {axis}: {lo}..{hi}"))?;
        // VTK encodes an empty axis as hi == lo - 1.
        if count < 0 {
            return Err(format!("inverted extent on axis {axis}: {lo}..{hi}"));
        }
        dims[axis] = usize::try_from(count)
            .map_err(|_| format!("extent too large on axis {axis}: {lo}..{hi}"))?;
    }
    Ok(dims)
}

/// Format point counts as a zero-based extent.
pub(crate) fn format_extent(dims: [usize; 3]) -> String {
    dims.iter()
        .map(|&n| format!("0 {}", n as i64 - 1))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse whitespace-separated values. On failure returns the index and
/// offending token.
pub(crate) fn parse_values(text: &str) -> Result<Vec<f64>, (usize, String)> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, t)| t.parse::<f64>().map_err(|_| (i, t.to_string())))
        .collect()
}

/// Shortest round-trip representation, space separated.
pub(crate) fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn format_triple(v: [f64; 3]) -> String {
    format_values(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extent() {
        assert_eq!(parse_extent("0 2 0 1 0 0").unwrap(), [3, 2, 1]);
        assert_eq!(parse_extent("5 6 -1 1 3 3").unwrap(), [2, 3, 1]);
        assert_eq!(parse_extent("0 -1 0 0 0 0").unwrap(), [0, 1, 1]);
        assert!(parse_extent("0 2 0 1").is_err());
        assert!(parse_extent("0 a 0 1 0 0").is_err());
        assert!(parse_extent("0 -4 0 1 0 0").is_err());
    }

    #[test]
    fn test_parse_extent_overflow_is_an_error() {
        assert!(parse_extent("0 9223372036854775807 0 0 0 0").is_err());
        assert!(parse_extent("-9223372036854775808 0 0 0 0 0").is_err());
        assert!(parse_extent("1 -9223372036854775808 0 0 0 0").is_err());
    }

    #[test]
    fn test_format_extent_matches_parse() {
        assert_eq!(format_extent([3, 2, 1]), "0 2 0 1 0 0");
        assert_eq!(parse_extent(&format_extent([4, 5, 6])).unwrap(), [4, 5, 6]);
    }

    #[test]
    fn test_parse_values_reports_bad_token() {
        assert_eq!(parse_values(" 1 2.5\n-3e2 ").unwrap(), vec![1.0, 2.5, -300.0]);
        assert_eq!(parse_values("1 x 3").unwrap_err(), (1, "x".to_string()));
    }

    #[test]
    fn test_read_minimal_image_data() {
        let xml = r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="0.1" byte_order="LittleEndian">
  <ImageData WholeExtent="0 1 0 0 0 0" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="0 1 0 0 0 0">
      <PointData Scalars="Depths">
        <DataArray type="Float64" Name="Depths" format="ascii">1.5 2.5</DataArray>
      </PointData>
      <CellData>
      </CellData>
    </Piece>
  </ImageData>
</VTKFile>"#;
        let file: VtkFile = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(file.kind, "ImageData");
        let image = file.image_data.unwrap();
        assert_eq!(image.pieces.len(), 1);
        let array = image.pieces[0]
            .point_data
            .as_ref()
            .and_then(|pd| pd.array("Depths"))
            .unwrap();
        assert_eq!(array.data_type, "Float64");
        assert_eq!(array.component_count(), 1);
        assert_eq!(parse_values(&array.text).unwrap(), vec![1.5, 2.5]);
    }
}
