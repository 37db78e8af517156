mod cursor;
mod decoder;
mod header;
mod marker;
pub mod segments;

pub use cursor::ByteCursor;
pub use header::*;
pub use marker::{expect_marker, read_any_marker, JPEGMarker, SegmentKind};

use crate::error::Result;

/// Settings for reading a JPEG header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Copy the JFIF thumbnail pixels into [`JfifHeader::thumbnail`]. When off, the thumbnail
    /// bytes are still validated against the segment length but skipped.
    pub read_thumbnail: bool,
    /// Require the segment right after the start of image to be a JFIF APP0 segment.
    pub require_jfif: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            read_thumbnail: true,
            require_jfif: false,
        }
    }
}

/// Reads the header segments of JPEG image data
#[derive(Debug, Clone, Copy)]
pub struct JPEGDecoder<'data> {
    image_data: &'data [u8],
    options: DecoderOptions,
}

impl<'data> JPEGDecoder<'data> {
    /// Initializes the JPEG decoder from a byte slice
    pub fn new(image_data: &'data [u8]) -> Self {
        Self::with_options(image_data, DecoderOptions::default())
    }

    /// Initializes the JPEG decoder from a byte slice with non-default settings
    pub fn with_options(image_data: &'data [u8], options: DecoderOptions) -> Self {
        Self {
            image_data,
            options,
        }
    }

    /// Reads every segment from the start of image through the first start of scan header.
    ///
    /// Each call starts over from the beginning of the data.
    pub fn decode_header(&self) -> Result<HeaderInfo> {
        decoder::HeaderReader::new(self.image_data, self.options).read_header_info()
    }
}

/// Reads the header of `data` with default options.
pub fn parse_header(data: &[u8]) -> Result<HeaderInfo> {
    JPEGDecoder::new(data).decode_header()
}
