//! One reader per modelled segment type, plus a reader that steps over segments without
//! interpreting them.
//!
//! Each reader starts just after the two marker bytes and, on success, leaves the cursor at
//! `marker offset + 2 + declared length`, which is where the next marker begins.

use num_traits::FromPrimitive;
use tracing::trace;

use crate::error::{Error, Result};

use super::{cursor::ByteCursor, header::*, marker::JPEGMarker};

const JFIF_IDENTIFIER: &[u8; 5] = b"JFIF\0";
const JFXX_IDENTIFIER: &[u8; 5] = b"JFXX\0";

/// Identifier, version, unit, two densities and two thumbnail dimensions
const JFIF_FIXED_LEN: usize = 14;

/// Precision, height, width and component count
const FRAME_FIXED_LEN: usize = 6;

/// Reads a segment length and checks the body it declares fits in the buffer.
///
/// Returns the declared length, which counts the two length bytes.
pub fn read_segment_length(reader: &mut ByteCursor, marker: JPEGMarker) -> Result<u16> {
    let offset = reader.position();
    let length = reader.read_next_word()?;
    if length < 2 {
        return Err(Error::malformed(
            marker,
            offset,
            "Segment length is shorter than the length field",
        ));
    }

    reader.ensure(length as usize - 2)?;
    Ok(length)
}

/// Steps over a segment without interpreting its body.
pub fn skip_segment(reader: &mut ByteCursor, marker: JPEGMarker) -> Result<u16> {
    let length = read_segment_length(reader, marker)?;
    reader.skip(length as usize - 2)?;
    trace!(?marker, length, "skipped segment");
    Ok(length)
}

/// Reads an APP0 segment.
///
/// Returns `None` for a JFIF extension (`JFXX`) segment, whose body is skipped.
pub fn read_app0(reader: &mut ByteCursor, read_thumbnail: bool) -> Result<Option<JfifHeader>> {
    let marker = JPEGMarker::APP0;
    let length = read_segment_length(reader, marker)?;
    let body_len = length as usize - 2;
    let body_offset = reader.position();

    if body_len < JFIF_IDENTIFIER.len() {
        return Err(Error::malformed(
            marker,
            body_offset,
            "APP0 segment is too short for an identifier",
        ));
    }

    let identifier = reader.read_bytes(JFIF_IDENTIFIER.len())?;
    if identifier == JFXX_IDENTIFIER {
        reader.skip(body_len - JFXX_IDENTIFIER.len())?;
        trace!(length, "skipped JFIF extension segment");
        return Ok(None);
    }
    if identifier != JFIF_IDENTIFIER {
        return Err(Error::malformed(marker, body_offset, "Invalid JFIF identifier"));
    }

    if body_len < JFIF_FIXED_LEN {
        return Err(Error::malformed(
            marker,
            body_offset,
            "APP0 segment is shorter than the JFIF fields",
        ));
    }

    let version = [reader.read_next_byte()?, reader.read_next_byte()?];

    let unit_offset = reader.position();
    let density_unit = DensityUnit::from_u8(reader.read_next_byte()?)
        .ok_or_else(|| Error::malformed(marker, unit_offset, "Invalid density unit"))?;

    let density_offset = reader.position();
    let x_density = reader.read_next_word()?;
    let y_density = reader.read_next_word()?;
    if density_unit != DensityUnit::None && (x_density == 0 || y_density == 0) {
        return Err(Error::malformed(marker, density_offset, "Pixel density is zero"));
    }

    let mut jfif = JfifHeader {
        length,
        version,
        density_unit,
        x_density,
        y_density,
        x_thumbnail: reader.read_next_byte()?,
        y_thumbnail: reader.read_next_byte()?,
        thumbnail: Vec::new(),
    };

    let thumbnail_len = jfif.thumbnail_len();
    if body_len != JFIF_FIXED_LEN + thumbnail_len {
        return Err(Error::malformed(
            marker,
            reader.position(),
            "APP0 length does not match the thumbnail size",
        ));
    }

    if read_thumbnail {
        jfif.thumbnail = reader.read_bytes(thumbnail_len)?.to_vec();
    } else {
        reader.skip(thumbnail_len)?;
    }

    Ok(Some(jfif))
}

/// Reads every table packed into one DQT segment, in stream order.
pub fn read_quantization_tables(reader: &mut ByteCursor) -> Result<Vec<QuantizationTable>> {
    let marker = JPEGMarker::DQT;
    let length = read_segment_length(reader, marker)?;
    let end_of_segment = reader.position() + length as usize - 2;

    if length == 2 {
        return Err(Error::malformed(
            marker,
            reader.position(),
            "DQT segment holds no tables",
        ));
    }

    let mut tables = Vec::new();
    while reader.position() < end_of_segment {
        let entry_offset = reader.position();
        let table_info = reader.read_next_byte()?;

        let precision = QuantizationPrecision::from_u8(table_info >> 4).ok_or_else(|| {
            Error::malformed(marker, entry_offset, "Invalid quantization table precision")
        })?;

        let destination_id = table_info & 0x0F;
        if destination_id > 3 {
            return Err(Error::malformed(
                marker,
                entry_offset,
                "Quantization table destination must be 0-3",
            ));
        }

        if end_of_segment - reader.position() < precision.entry_len() - 1 {
            return Err(Error::malformed(
                marker,
                entry_offset,
                "Quantization table overruns the DQT segment",
            ));
        }

        let mut table = [[0u16; 8]; 8];
        for i in 0..64 {
            table[i / 8][i % 8] = match precision {
                QuantizationPrecision::Bits8 => reader.read_next_byte()? as u16,
                QuantizationPrecision::Bits16 => reader.read_next_word()?,
            };
        }

        tables.push(QuantizationTable {
            precision,
            destination_id,
            table,
        });
    }

    Ok(tables)
}

/// Reads a start of frame segment introduced by any of the SOFn markers.
pub fn read_start_of_frame(reader: &mut ByteCursor, marker: JPEGMarker) -> Result<FrameHeader> {
    let length = read_segment_length(reader, marker)?;
    let body_offset = reader.position();

    if (length as usize) < 2 + FRAME_FIXED_LEN {
        return Err(Error::malformed(
            marker,
            body_offset,
            "Frame header is shorter than its fixed fields",
        ));
    }

    let precision = reader.read_next_byte()?;

    let size_offset = reader.position();
    let height = reader.read_next_word()?;
    let width = reader.read_next_word()?;
    if width == 0 || height == 0 {
        return Err(Error::malformed(marker, size_offset, "Image dimension is zero"));
    }

    let count_offset = reader.position();
    let component_count = reader.read_next_byte()?;
    if !matches!(component_count, 1 | 3 | 4) {
        return Err(Error::malformed(
            marker,
            count_offset,
            "Frame must have 1, 3 or 4 components",
        ));
    }

    if length as usize != 2 + FRAME_FIXED_LEN + 3 * component_count as usize {
        return Err(Error::malformed(
            marker,
            count_offset,
            "Frame length does not match the component count",
        ));
    }

    let mut components: Vec<FrameComponent> = Vec::with_capacity(component_count as usize);
    for _ in 0..component_count {
        let component_offset = reader.position();

        let identifier = reader.read_next_byte()?;
        if components.iter().any(|c| c.identifier == identifier) {
            return Err(Error::malformed(
                marker,
                component_offset,
                "Duplicate component identifier",
            ));
        }

        let sample_factors = reader.read_next_byte()?;
        let xy_sampling_factor = (sample_factors >> 4, sample_factors & 0x0F);
        if !(1..=4).contains(&xy_sampling_factor.0) || !(1..=4).contains(&xy_sampling_factor.1) {
            return Err(Error::malformed(
                marker,
                component_offset + 1,
                "Sampling factors must be 1-4",
            ));
        }

        let qtable_id = reader.read_next_byte()?;
        if qtable_id > 3 {
            return Err(Error::malformed(
                marker,
                component_offset + 2,
                "Quantization table selector must be 0-3",
            ));
        }

        components.push(FrameComponent {
            identifier,
            xy_sampling_factor,
            qtable_id,
        })
    }

    Ok(FrameHeader {
        marker,
        length,
        precision,
        image_size: (width, height),
        components,
    })
}

/// Reads a DRI segment and returns the restart interval in MCUs.
pub fn read_restart_interval(reader: &mut ByteCursor) -> Result<u16> {
    let marker = JPEGMarker::DRI;
    let length = read_segment_length(reader, marker)?;
    if length != 4 {
        return Err(Error::malformed(
            marker,
            reader.position(),
            "DRI segment length must be 4",
        ));
    }
    reader.read_next_word()
}

/// Reads the scan header, leaving the cursor at the first byte of entropy-coded data.
pub fn read_start_of_scan(reader: &mut ByteCursor) -> Result<ScanHeader> {
    let marker = JPEGMarker::SOS;
    let length = read_segment_length(reader, marker)?;

    let count_offset = reader.position();
    if length < 3 {
        return Err(Error::malformed(
            marker,
            count_offset,
            "Scan header is too short for a component count",
        ));
    }

    let component_count = reader.read_next_byte()?;
    if !(1..=4).contains(&component_count) {
        return Err(Error::malformed(
            marker,
            count_offset,
            "Scan must have 1 to 4 components",
        ));
    }
    if length as usize != 6 + 2 * component_count as usize {
        return Err(Error::malformed(
            marker,
            count_offset,
            "Scan header length does not match the component count",
        ));
    }

    let mut components = Vec::with_capacity(component_count as usize);
    for _ in 0..component_count {
        let selector = reader.read_next_byte()?;

        let tables = reader.read_next_byte()?;
        let dc_table = tables >> 4;
        let ac_table = tables & 0x0F;

        components.push(ScanComponent {
            selector,
            dc_table,
            ac_table,
        });
    }

    let spectral_selection_start = reader.read_next_byte()?;
    let spectral_selection_end = reader.read_next_byte()?;

    let approximation = reader.read_next_byte()?;

    Ok(ScanHeader {
        length,
        components,
        spectral_selection: (spectral_selection_start, spectral_selection_end),
        successive_approximation: (approximation >> 4, approximation & 0x0F),
    })
}
