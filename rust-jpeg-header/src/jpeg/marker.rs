use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::{Error, Result};

use super::cursor::ByteCursor;

/// Every byte that may follow `0xFF` to form a marker.
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[repr(u8)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, Debug, Clone, Copy)]
pub enum JPEGMarker {
    /// Temporary use in arithmetic coding
    TEM = 0x01,
    /// Reserved. Stands for every code from 0x02 through 0xBF
    RES = 0x02,

    /// Baseline DCT frame
    SOF0 = 0xC0,
    /// Extended sequential DCT frame
    SOF1 = 0xC1,
    /// Progressive DCT frame
    SOF2 = 0xC2,
    /// Lossless frame
    SOF3 = 0xC3,
    /// Define Huffman tables
    DHT = 0xC4,
    /// Differential sequential DCT frame
    SOF5 = 0xC5,
    /// Differential progressive DCT frame
    SOF6 = 0xC6,
    /// Differential lossless frame
    SOF7 = 0xC7,
    /// Reserved for JPEG extensions
    JPG = 0xC8,
    /// Extended sequential DCT frame, arithmetic coding
    SOF9 = 0xC9,
    /// Progressive DCT frame, arithmetic coding
    SOF10 = 0xCA,
    /// Lossless frame, arithmetic coding
    SOF11 = 0xCB,
    /// Define arithmetic coding conditioning
    DAC = 0xCC,
    /// Differential sequential DCT frame, arithmetic coding
    SOF13 = 0xCD,
    /// Differential progressive DCT frame, arithmetic coding
    SOF14 = 0xCE,
    /// Differential lossless frame, arithmetic coding
    SOF15 = 0xCF,

    /// Restart with modulo 8 count 0
    RST0 = 0xD0,
    /// Restart with modulo 8 count 1
    RST1 = 0xD1,
    /// Restart with modulo 8 count 2
    RST2 = 0xD2,
    /// Restart with modulo 8 count 3
    RST3 = 0xD3,
    /// Restart with modulo 8 count 4
    RST4 = 0xD4,
    /// Restart with modulo 8 count 5
    RST5 = 0xD5,
    /// Restart with modulo 8 count 6
    RST6 = 0xD6,
    /// Restart with modulo 8 count 7
    RST7 = 0xD7,

    /// Start of image
    SOI = 0xD8,
    /// End of image
    EOI = 0xD9,
    /// Start of scan
    SOS = 0xDA,
    /// Define quantization tables
    DQT = 0xDB,
    /// Define number of lines
    DNL = 0xDC,
    /// Define restart interval
    DRI = 0xDD,
    /// Define hierarchical progression
    DHP = 0xDE,
    /// Expand reference components
    EXP = 0xDF,

    /// Application segment 0
    APP0 = 0xE0,
    /// Application segment 1
    APP1 = 0xE1,
    /// Application segment 2
    APP2 = 0xE2,
    /// Application segment 3
    APP3 = 0xE3,
    /// Application segment 4
    APP4 = 0xE4,
    /// Application segment 5
    APP5 = 0xE5,
    /// Application segment 6
    APP6 = 0xE6,
    /// Application segment 7
    APP7 = 0xE7,
    /// Application segment 8
    APP8 = 0xE8,
    /// Application segment 9
    APP9 = 0xE9,
    /// Application segment 10
    APP10 = 0xEA,
    /// Application segment 11
    APP11 = 0xEB,
    /// Application segment 12
    APP12 = 0xEC,
    /// Application segment 13
    APP13 = 0xED,
    /// Application segment 14
    APP14 = 0xEE,
    /// Application segment 15
    APP15 = 0xEF,

    /// Reserved for JPEG extensions (0)
    JPG0 = 0xF0,
    /// Reserved for JPEG extensions (1)
    JPG1 = 0xF1,
    /// Reserved for JPEG extensions (2)
    JPG2 = 0xF2,
    /// Reserved for JPEG extensions (3)
    JPG3 = 0xF3,
    /// Reserved for JPEG extensions (4)
    JPG4 = 0xF4,
    /// Reserved for JPEG extensions (5)
    JPG5 = 0xF5,
    /// Reserved for JPEG extensions (6)
    JPG6 = 0xF6,
    /// Reserved for JPEG extensions (7)
    JPG7 = 0xF7,
    /// Reserved for JPEG extensions (8)
    JPG8 = 0xF8,
    /// Reserved for JPEG extensions (9)
    JPG9 = 0xF9,
    /// Reserved for JPEG extensions (10)
    JPG10 = 0xFA,
    /// Reserved for JPEG extensions (11)
    JPG11 = 0xFB,
    /// Reserved for JPEG extensions (12)
    JPG12 = 0xFC,
    /// Reserved for JPEG extensions (13)
    JPG13 = 0xFD,

    /// Comment
    COM = 0xFE,
}

/// How the header reader handles a marker.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SegmentKind {
    /// SOI
    StartOfImage,
    /// EOI
    EndOfImage,
    /// APP0, read as a JFIF header
    Jfif,
    /// DQT
    QuantizationTables,
    /// Any of the SOFn frame headers
    StartOfFrame,
    /// DRI
    RestartInterval,
    /// SOS, the last segment read
    StartOfScan,
    /// No length field and no body
    Standalone,
    /// Length-delimited body the reader does not interpret
    Skip,
}

impl JPEGMarker {
    /// Looks up the marker for the byte following `0xFF`.
    ///
    /// `0x00` (a stuffed data byte) and `0xFF` (a fill byte) are not markers. All reserved
    /// codes map to [`JPEGMarker::RES`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x02..=0xBF => Some(JPEGMarker::RES),
            _ => FromPrimitive::from_u8(code),
        }
    }

    /// The byte following `0xFF`. Reserved markers all report `0x02`.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The marker as it appears in the stream.
    pub fn to_bytes(self) -> [u8; 2] {
        [0xFF, self.code()]
    }

    /// Whether a big-endian length field follows the marker.
    pub fn has_length(self) -> bool {
        !matches!(self, JPEGMarker::SOI | JPEGMarker::EOI | JPEGMarker::TEM) && !self.is_restart()
    }

    /// RST0 through RST7
    pub fn is_restart(self) -> bool {
        (JPEGMarker::RST0..=JPEGMarker::RST7).contains(&self)
    }

    /// SOF0 through SOF15. DHT, JPG and DAC share the range but are not frame headers.
    pub fn is_start_of_frame(self) -> bool {
        (JPEGMarker::SOF0..=JPEGMarker::SOF15).contains(&self)
            && !matches!(self, JPEGMarker::DHT | JPEGMarker::JPG | JPEGMarker::DAC)
    }

    /// APP0 through APP15
    pub fn is_application(self) -> bool {
        (JPEGMarker::APP0..=JPEGMarker::APP15).contains(&self)
    }

    /// The dispatch table of the header reader. Every marker maps to exactly one kind.
    pub fn segment_kind(self) -> SegmentKind {
        match self {
            JPEGMarker::SOI => SegmentKind::StartOfImage,
            JPEGMarker::EOI => SegmentKind::EndOfImage,
            JPEGMarker::APP0 => SegmentKind::Jfif,
            JPEGMarker::DQT => SegmentKind::QuantizationTables,
            JPEGMarker::DRI => SegmentKind::RestartInterval,
            JPEGMarker::SOS => SegmentKind::StartOfScan,
            marker if marker.is_start_of_frame() => SegmentKind::StartOfFrame,
            marker if !marker.has_length() => SegmentKind::Standalone,
            _ => SegmentKind::Skip,
        }
    }
}

/// Reads the marker at the cursor and checks it is `expected`.
///
/// On a mismatch the cursor is left at the marker so the caller can report or inspect it.
pub fn expect_marker(reader: &mut ByteCursor, expected: JPEGMarker) -> Result<()> {
    let offset = reader.position();
    let bytes = reader.peek_bytes(2)?;
    if bytes != expected.to_bytes() {
        return Err(Error::InvalidMarker {
            offset,
            expected: Some(expected),
            actual: [bytes[0], bytes[1]],
        });
    }
    reader.skip(2)
}

/// Reads whichever marker is at the cursor.
///
/// Extra `0xFF` fill bytes in front of the marker code are consumed. A missing `0xFF` prefix
/// or the stuffed `0xFF 0x00` fails with [`Error::InvalidMarker`] and leaves the cursor at the
/// offending bytes.
pub fn read_any_marker(reader: &mut ByteCursor) -> Result<JPEGMarker> {
    loop {
        let offset = reader.position();
        let bytes = reader.peek_bytes(2)?;

        if bytes[0] != 0xFF {
            return Err(Error::InvalidMarker {
                offset,
                expected: None,
                actual: [bytes[0], bytes[1]],
            });
        }

        if bytes[1] == 0xFF {
            reader.skip(1)?;
            continue;
        }

        return match JPEGMarker::from_code(bytes[1]) {
            Some(marker) => {
                reader.skip(2)?;
                Ok(marker)
            }
            None => Err(Error::InvalidMarker {
                offset,
                expected: None,
                actual: [bytes[0], bytes[1]],
            }),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    static TEST_HEADER: [u8; 28] = [
        0xFF, 0xD8, // Start of image
        0xFF, 0xC0, // Start of frame
        0, 17,          // Length
        8,              // Precision
        0, 128,         // Height
        0, 128,         // Width
        3,              // Component count
        1, 0x11, 0,
        2, 0x11, 1,
        3, 0x11, 1,     // Component data
        0xFF, 0xFE, // Comment
        0, 3,           // Length
        65,             // Content
        0xFF, 0x00  // Stuffed byte, not a marker
    ];

    #[test]
    fn read_markers() {
        let mut reader = ByteCursor::new(&TEST_HEADER);
        assert_eq!(read_any_marker(&mut reader).unwrap(), JPEGMarker::SOI);
        assert_eq!(read_any_marker(&mut reader).unwrap(), JPEGMarker::SOF0);
        reader.skip(17).unwrap();
        assert_eq!(read_any_marker(&mut reader).unwrap(), JPEGMarker::COM);
        reader.skip(3).unwrap();

        let err = read_any_marker(&mut reader).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidMarker {
                offset: 26,
                expected: None,
                actual: [0xFF, 0x00]
            }
        );
        assert_eq!(reader.position(), 26);
    }

    #[test]
    fn expect_marker_does_not_advance_on_mismatch() {
        let mut reader = ByteCursor::new(&TEST_HEADER);
        expect_marker(&mut reader, JPEGMarker::SOI).unwrap();
        assert_eq!(reader.position(), 2);

        let err = expect_marker(&mut reader, JPEGMarker::APP0).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidMarker {
                offset: 2,
                expected: Some(JPEGMarker::APP0),
                actual: [0xFF, 0xC0]
            }
        );
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn fill_bytes_before_marker() {
        let data = [0xFF, 0xFF, 0xFF, 0xDB];
        let mut reader = ByteCursor::new(&data);
        assert_eq!(read_any_marker(&mut reader).unwrap(), JPEGMarker::DQT);
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn rejects_missing_prefix_and_stuffing() {
        let mut reader = ByteCursor::new(&[0x12, 0xD8]);
        assert!(matches!(
            read_any_marker(&mut reader),
            Err(Error::InvalidMarker { offset: 0, expected: None, .. })
        ));

        let mut reader = ByteCursor::new(&[0xFF, 0x00]);
        assert!(matches!(
            read_any_marker(&mut reader),
            Err(Error::InvalidMarker { actual: [0xFF, 0x00], .. })
        ));

        let mut reader = ByteCursor::new(&[0xFF]);
        assert!(matches!(
            read_any_marker(&mut reader),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn marker_classification() {
        for code in 0xC0..=0xCF {
            let marker = JPEGMarker::from_code(code).unwrap();
            let is_frame = !matches!(code, 0xC4 | 0xC8 | 0xCC);
            assert_eq!(marker.is_start_of_frame(), is_frame, "{marker:?}");
            assert_eq!(marker.code(), code);
        }

        for code in 0xD0..=0xD7 {
            let marker = JPEGMarker::from_code(code).unwrap();
            assert!(marker.is_restart());
            assert!(!marker.has_length());
            assert_eq!(marker.segment_kind(), SegmentKind::Standalone);
        }

        assert!(!JPEGMarker::SOI.has_length());
        assert!(!JPEGMarker::EOI.has_length());
        assert!(!JPEGMarker::TEM.has_length());
        assert!(JPEGMarker::SOS.has_length());
        assert!(JPEGMarker::APP14.is_application());

        assert_eq!(JPEGMarker::from_code(0x00), None);
        assert_eq!(JPEGMarker::from_code(0xFF), None);
        assert_eq!(JPEGMarker::from_code(0x01), Some(JPEGMarker::TEM));
    }

    #[test]
    fn reserved_codes_are_skippable_markers() {
        for code in 0x02..=0xBF {
            assert_eq!(JPEGMarker::from_code(code), Some(JPEGMarker::RES), "{code:#04X}");
        }
        assert!(JPEGMarker::RES.has_length());
        assert_eq!(JPEGMarker::RES.segment_kind(), SegmentKind::Skip);

        let mut reader = ByteCursor::new(&[0xFF, 0x50, 0x00, 0x04]);
        assert_eq!(read_any_marker(&mut reader).unwrap(), JPEGMarker::RES);
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn dispatch_table() {
        assert_eq!(JPEGMarker::APP0.segment_kind(), SegmentKind::Jfif);
        assert_eq!(JPEGMarker::DQT.segment_kind(), SegmentKind::QuantizationTables);
        assert_eq!(JPEGMarker::SOF2.segment_kind(), SegmentKind::StartOfFrame);
        assert_eq!(JPEGMarker::DRI.segment_kind(), SegmentKind::RestartInterval);
        assert_eq!(JPEGMarker::SOS.segment_kind(), SegmentKind::StartOfScan);
        assert_eq!(JPEGMarker::EOI.segment_kind(), SegmentKind::EndOfImage);
        assert_eq!(JPEGMarker::SOI.segment_kind(), SegmentKind::StartOfImage);
        assert_eq!(JPEGMarker::TEM.segment_kind(), SegmentKind::Standalone);

        for marker in [
            JPEGMarker::DHT,
            JPEGMarker::DAC,
            JPEGMarker::APP1,
            JPEGMarker::COM,
            JPEGMarker::DNL,
            JPEGMarker::JPG13,
        ] {
            assert_eq!(marker.segment_kind(), SegmentKind::Skip, "{marker:?}");
        }
    }
}
