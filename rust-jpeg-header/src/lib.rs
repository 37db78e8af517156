//! Reads and validates the marker segments at the front of JPEG/JFIF images: the JFIF
//! header, quantization tables, frame geometry and scan header, up to the first byte of
//! entropy-coded data.
#![warn(missing_docs)]

mod error;
/// Header reader for JPEG images
pub mod jpeg;

pub use error::{Error, Result};
pub use jpeg::{parse_header, DecoderOptions, HeaderInfo, JPEGDecoder};
