use std::{cmp::max, collections::HashMap};

use num_derive::FromPrimitive;

use super::marker::JPEGMarker;

/// Row and column of each coefficient of an 8x8 block, in zig-zag sequence order.
#[rustfmt::skip]
pub const ZIGZAG_MAP: &[(u8, u8)] =
    &[(0, 0), (0, 1), (1, 0), (2, 0), (1, 1), (0, 2), (0, 3), (1, 2),
          (2, 1), (3, 0), (4, 0), (3, 1), (2, 2), (1, 3), (0, 4), (0, 5),
          (1, 4), (2, 3), (3, 2), (4, 1), (5, 0), (6, 0), (5, 1), (4, 2),
          (3, 3), (2, 4), (1, 5), (0, 6), (0, 7), (1, 6), (2, 5), (3, 4),
          (4, 3), (5, 2), (6, 1), (7, 0), (7, 1), (6, 2), (5, 3), (4, 4),
          (3, 5), (2, 6), (1, 7), (2, 7), (3, 6), (4, 5), (5, 4), (6, 3),
          (7, 2), (7, 3), (6, 4), (5, 5), (4, 6), (3, 7), (4, 7), (5, 6),
          (6, 5), (7, 4), (7, 5), (6, 6), (5, 7), (6, 7), (7, 6), (7, 7)];

/// Units of the JFIF pixel density fields
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, FromPrimitive)]
pub enum DensityUnit {
    /// Density only gives the pixel aspect ratio
    #[default]
    None = 0,
    /// Dots per inch
    PixelsPerInch = 1,
    /// Dots per centimetre
    PixelsPerCm = 2,
}

/// Contents of the JFIF APP0 segment
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct JfifHeader {
    /// Declared segment length, including the length field itself
    pub length: u16,
    /// Major and minor version
    pub version: [u8; 2],
    /// Unit of `x_density` and `y_density`
    pub density_unit: DensityUnit,
    /// Horizontal pixel density
    pub x_density: u16,
    /// Vertical pixel density
    pub y_density: u16,
    /// Thumbnail width in pixels
    pub x_thumbnail: u8,
    /// Thumbnail height in pixels
    pub y_thumbnail: u8,
    /// Packed RGB thumbnail pixels. Empty when the image has no thumbnail or when
    /// thumbnail reading is turned off.
    pub thumbnail: Vec<u8>,
}

impl JfifHeader {
    /// Size in bytes of the uncompressed RGB thumbnail the segment declares.
    pub fn thumbnail_len(&self) -> usize {
        if self.x_thumbnail == 0 || self.y_thumbnail == 0 {
            0
        } else {
            3 * self.x_thumbnail as usize * self.y_thumbnail as usize
        }
    }
}

/// Coefficient width of a quantization table, the high nibble of its first byte
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, FromPrimitive)]
pub enum QuantizationPrecision {
    /// One byte per coefficient
    #[default]
    Bits8 = 0,
    /// Two big-endian bytes per coefficient
    Bits16 = 1,
}

impl QuantizationPrecision {
    /// Bytes per coefficient
    pub fn coefficient_size(self) -> usize {
        match self {
            QuantizationPrecision::Bits8 => 1,
            QuantizationPrecision::Bits16 => 2,
        }
    }

    /// Bytes one table occupies inside a DQT segment, including its precision/destination byte.
    pub fn entry_len(self) -> usize {
        1 + 64 * self.coefficient_size()
    }
}

/// One table from a DQT segment
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct QuantizationTable {
    /// Coefficient width
    pub precision: QuantizationPrecision,
    /// Slot 0-3 the table is installed in
    pub destination_id: u8,
    /// Coefficients in stream order, coefficient `i` at `table[i / 8][i % 8]`.
    pub table: [[u16; 8]; 8],
}

impl QuantizationTable {
    /// Reads the stored coefficients as a zig-zag sequence and places them at their
    /// frequency positions.
    pub fn to_natural_order(&self) -> [[u16; 8]; 8] {
        let mut natural = [[0u16; 8]; 8];
        for (i, &(row, col)) in ZIGZAG_MAP.iter().enumerate() {
            natural[row as usize][col as usize] = self.table[i / 8][i % 8];
        }
        natural
    }
}

/// A component specification in a frame header
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct FrameComponent {
    /// Component id, referenced by scan headers
    pub identifier: u8,
    /// Horizontal and vertical sampling factor
    pub xy_sampling_factor: (u8, u8),
    /// Destination of the quantization table the component uses
    pub qtable_id: u8,
}

/// Contents of a start of frame segment
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FrameHeader {
    /// The SOFn marker the frame was introduced by
    pub marker: JPEGMarker,
    /// Declared segment length
    pub length: u16,
    /// Bits per sample
    pub precision: u8,
    /// Width and height in pixels
    pub image_size: (u16, u16),
    /// Component specifications in stream order
    pub components: Vec<FrameComponent>,
}

impl FrameHeader {
    /// Progressive DCT frame, Huffman or arithmetic, differential or not
    pub fn is_progressive(&self) -> bool {
        matches!(
            self.marker,
            JPEGMarker::SOF2 | JPEGMarker::SOF6 | JPEGMarker::SOF10 | JPEGMarker::SOF14
        )
    }

    /// Lossless (predictive) frame
    pub fn is_lossless(&self) -> bool {
        matches!(
            self.marker,
            JPEGMarker::SOF3 | JPEGMarker::SOF7 | JPEGMarker::SOF11 | JPEGMarker::SOF15
        )
    }

    /// Arithmetic rather than Huffman entropy coding
    pub fn is_arithmetic(&self) -> bool {
        self.marker.is_start_of_frame() && self.marker >= JPEGMarker::SOF9
    }

    /// Hierarchical (differential) frame
    pub fn is_differential(&self) -> bool {
        matches!(
            self.marker,
            JPEGMarker::SOF5
                | JPEGMarker::SOF6
                | JPEGMarker::SOF7
                | JPEGMarker::SOF13
                | JPEGMarker::SOF14
                | JPEGMarker::SOF15
        )
    }

    /// The component with the given id
    pub fn component(&self, identifier: u8) -> Option<&FrameComponent> {
        self.components.iter().find(|c| c.identifier == identifier)
    }

    /// Block geometry of an interleaved scan over this frame.
    pub fn mcu_info(&self) -> MCUInfo {
        let max_xy_sampling_factor = self.components.iter().fold(
            (1, 1),
            |(max_h_fac, max_v_fac), component| {
                (
                    max(component.xy_sampling_factor.0, max_h_fac),
                    max(component.xy_sampling_factor.1, max_v_fac),
                )
            },
        );

        let mcu_size = (
            8 * u16::from(max_xy_sampling_factor.0),
            8 * u16::from(max_xy_sampling_factor.1),
        );
        let padded_size = pad(self.image_size, mcu_size);

        MCUInfo {
            max_xy_sampling_factor,
            mcu_size,
            mcu_dimensions: (
                padded_size.0 / mcu_size.0 as u32,
                padded_size.1 / mcu_size.1 as u32,
            ),
            padded_size,
        }
    }
}

/// Minimum coded unit geometry of a frame
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct MCUInfo {
    /// Largest horizontal and vertical sampling factor over all components
    pub max_xy_sampling_factor: (u8, u8),
    /// MCU width and height in pixels
    pub mcu_size: (u16, u16),
    /// Number of MCUs per row and per column
    pub mcu_dimensions: (u32, u32),
    /// Image size rounded up to whole MCUs
    pub padded_size: (u32, u32),
}

/// A component entry in the scan header
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ScanComponent {
    /// Id of the frame component the scan codes
    pub selector: u8,
    /// DC entropy table destination
    pub dc_table: u8,
    /// AC entropy table destination
    pub ac_table: u8,
}

/// Contents of the start of scan segment that ends the header
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ScanHeader {
    /// Declared segment length
    pub length: u16,
    /// Components in the scan, in stream order
    pub components: Vec<ScanComponent>,
    /// Start and end of spectral selection
    pub spectral_selection: (u8, u8),
    /// High and low successive approximation bit positions
    pub successive_approximation: (u8, u8),
}

/// A marker as it was found in the stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SegmentRecord {
    /// The marker read
    pub marker: JPEGMarker,
    /// Offset of the marker's `0xFF` byte
    pub offset: usize,
    /// Declared length, absent for markers without a length field
    pub length: Option<u16>,
}

impl SegmentRecord {
    /// Bytes the segment occupies, marker included.
    pub fn total_size(&self) -> usize {
        2 + self.length.map_or(0, usize::from)
    }
}

/// Everything read from the image up to the first scan.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct HeaderInfo {
    /// The JFIF APP0 segment, if the image has one
    pub jfif: Option<JfifHeader>,
    /// Quantization tables by destination id. A later table replaces an earlier one with the
    /// same id.
    pub quant_tables: HashMap<u8, QuantizationTable>,
    /// The frame header, absent if the scan came first
    pub frame: Option<FrameHeader>,
    /// MCUs per restart interval from the last DRI segment
    pub restart_interval: Option<u16>,
    /// The scan header that ended the read
    pub scan: ScanHeader,
    /// Every marker read, in stream order
    pub segments: Vec<SegmentRecord>,
    /// Offset of the first byte of entropy-coded data
    pub scan_data_offset: usize,
}

impl HeaderInfo {
    /// Width and height in pixels, if a frame header was read.
    pub fn dimensions(&self) -> Option<(u16, u16)> {
        self.frame.as_ref().map(|frame| frame.image_size)
    }

    /// The quantization table a frame component refers to, if one was defined.
    pub fn quantization_table_for(&self, component: &FrameComponent) -> Option<&QuantizationTable> {
        self.quant_tables.get(&component.qtable_id)
    }

    /// MCU geometry of the frame, if one was read.
    pub fn mcu_info(&self) -> Option<MCUInfo> {
        self.frame.as_ref().map(FrameHeader::mcu_info)
    }
}

fn pad(unpadded: (u16, u16), block_size: (u16, u16)) -> (u32, u32) {
    let round_up = |size: u16, block: u16| -> u32 {
        let (size, block) = (size as u32, block as u32);
        let remainder = size % block;
        if remainder == 0 {
            size
        } else {
            size + block - remainder
        }
    };

    (
        round_up(unpadded.0, block_size.0),
        round_up(unpadded.1, block_size.1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(marker: JPEGMarker, size: (u16, u16), factors: &[(u8, u8)]) -> FrameHeader {
        FrameHeader {
            marker,
            length: 8 + 3 * factors.len() as u16,
            precision: 8,
            image_size: size,
            components: factors
                .iter()
                .enumerate()
                .map(|(i, &xy_sampling_factor)| FrameComponent {
                    identifier: i as u8 + 1,
                    xy_sampling_factor,
                    qtable_id: (i > 0) as u8,
                })
                .collect(),
        }
    }

    #[test]
    fn mcu_geometry_with_subsampling() {
        let info = frame(JPEGMarker::SOF0, (100, 50), &[(2, 2), (1, 1), (1, 1)]).mcu_info();
        assert_eq!(info.max_xy_sampling_factor, (2, 2));
        assert_eq!(info.mcu_size, (16, 16));
        assert_eq!(info.padded_size, (112, 64));
        assert_eq!(info.mcu_dimensions, (7, 4));
    }

    #[test]
    fn mcu_geometry_exact_fit() {
        let info = frame(JPEGMarker::SOF0, (64, 8), &[(1, 1)]).mcu_info();
        assert_eq!(info.mcu_size, (8, 8));
        assert_eq!(info.padded_size, (64, 8));
        assert_eq!(info.mcu_dimensions, (8, 1));
    }

    #[test]
    fn mcu_geometry_with_large_sampling_factors() {
        let info = frame(JPEGMarker::SOF0, (1000, 10), &[(40, 1), (255, 255)]).mcu_info();
        assert_eq!(info.max_xy_sampling_factor, (255, 255));
        assert_eq!(info.mcu_size, (2040, 2040));
        assert_eq!(info.padded_size, (2040, 2040));
        assert_eq!(info.mcu_dimensions, (1, 1));

        let info = frame(JPEGMarker::SOF0, (1000, 10), &[(40, 1)]).mcu_info();
        assert_eq!(info.mcu_size, (320, 8));
        assert_eq!(info.padded_size, (1280, 16));
        assert_eq!(info.mcu_dimensions, (4, 2));
    }

    #[test]
    fn frame_kinds() {
        let baseline = frame(JPEGMarker::SOF0, (8, 8), &[(1, 1)]);
        assert!(!baseline.is_progressive());
        assert!(!baseline.is_arithmetic());
        assert!(!baseline.is_lossless());

        let progressive = frame(JPEGMarker::SOF2, (8, 8), &[(1, 1)]);
        assert!(progressive.is_progressive());
        assert!(!progressive.is_differential());

        let arithmetic = frame(JPEGMarker::SOF14, (8, 8), &[(1, 1)]);
        assert!(arithmetic.is_arithmetic());
        assert!(arithmetic.is_progressive());
        assert!(arithmetic.is_differential());

        assert!(frame(JPEGMarker::SOF3, (8, 8), &[(1, 1)]).is_lossless());
    }

    #[test]
    fn only_arithmetic_frame_markers_are_arithmetic() {
        for marker in [JPEGMarker::SOF9, JPEGMarker::SOF10, JPEGMarker::SOF11, JPEGMarker::SOF15] {
            assert!(frame(marker, (8, 8), &[(1, 1)]).is_arithmetic(), "{marker:?}");
        }
        for marker in [
            JPEGMarker::SOF1,
            JPEGMarker::DAC,
            JPEGMarker::DRI,
            JPEGMarker::APP0,
            JPEGMarker::JPG13,
            JPEGMarker::COM,
        ] {
            assert!(!frame(marker, (8, 8), &[(1, 1)]).is_arithmetic(), "{marker:?}");
        }
    }

    #[test]
    fn natural_order_undoes_zigzag() {
        let mut table = QuantizationTable::default();
        for i in 0..64 {
            table.table[i / 8][i % 8] = i as u16;
        }

        let natural = table.to_natural_order();
        assert_eq!(natural[0][0], 0);
        assert_eq!(natural[0][1], 1);
        assert_eq!(natural[1][0], 2);
        assert_eq!(natural[2][0], 3);
        assert_eq!(natural[7][7], 63);

        let mut seen: Vec<u16> = natural.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..64).collect::<Vec<u16>>());
    }

    #[test]
    fn thumbnail_length() {
        let mut jfif = JfifHeader::default();
        assert_eq!(jfif.thumbnail_len(), 0);
        jfif.x_thumbnail = 4;
        assert_eq!(jfif.thumbnail_len(), 0);
        jfif.y_thumbnail = 2;
        assert_eq!(jfif.thumbnail_len(), 24);
    }

    #[test]
    fn lookups() {
        let header = HeaderInfo {
            frame: Some(frame(JPEGMarker::SOF1, (640, 480), &[(2, 1), (1, 1), (1, 1)])),
            quant_tables: HashMap::from([(
                1,
                QuantizationTable {
                    destination_id: 1,
                    ..Default::default()
                },
            )]),
            ..Default::default()
        };

        assert_eq!(header.dimensions(), Some((640, 480)));
        let chroma = header.frame.as_ref().unwrap().component(2).unwrap();
        assert_eq!(header.quantization_table_for(chroma).unwrap().destination_id, 1);
        let luma = header.frame.as_ref().unwrap().component(1).unwrap();
        assert!(header.quantization_table_for(luma).is_none());
        assert_eq!(header.mcu_info().unwrap().mcu_size, (16, 8));

        assert_eq!(HeaderInfo::default().dimensions(), None);
    }
}
