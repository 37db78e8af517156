use tracing::debug;

use crate::error::{Error, Result};

use super::{
    cursor::ByteCursor,
    header::{HeaderInfo, SegmentRecord},
    marker::{expect_marker, read_any_marker, JPEGMarker, SegmentKind},
    segments, DecoderOptions,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    ExpectSoi,
    ReadingHeaders,
    Done,
}

/// Walks the marker segments of one buffer, from the start of image up to the first scan.
pub struct HeaderReader<'data> {
    reader: ByteCursor<'data>,
    options: DecoderOptions,
    state: State,
    result: HeaderInfo,
}

impl<'data> HeaderReader<'data> {
    pub fn new(data: &'data [u8], options: DecoderOptions) -> Self {
        Self {
            reader: ByteCursor::new(data),
            options,
            state: State::ExpectSoi,
            result: HeaderInfo::default(),
        }
    }

    /// Runs the reader to completion. Any error aborts the whole read.
    pub fn read_header_info(mut self) -> Result<HeaderInfo> {
        while self.state != State::Done {
            self.state = match self.state {
                State::ExpectSoi => self.read_start_of_image()?,
                State::ReadingHeaders => self.read_next_segment()?,
                State::Done => State::Done,
            };
        }

        debug!(
            scan_data_offset = self.result.scan_data_offset,
            segments = self.result.segments.len(),
            "header read"
        );
        Ok(self.result)
    }

    fn read_start_of_image(&mut self) -> Result<State> {
        if self.reader.len() < 2 {
            return Err(Error::InvalidContainer {
                offset: 0,
                reason: "Data is too short to hold a start of image marker",
            });
        }

        if expect_marker(&mut self.reader, JPEGMarker::SOI).is_err() {
            return Err(Error::InvalidContainer {
                offset: 0,
                reason: "This JPEG image does not have an SOI marker",
            });
        }
        self.record(JPEGMarker::SOI, 0, None);

        if self.options.require_jfif {
            let offset = self.reader.position();
            expect_marker(&mut self.reader, JPEGMarker::APP0)?;
            self.read_jfif(offset)?;
            if self.result.jfif.is_none() {
                return Err(Error::malformed(
                    JPEGMarker::APP0,
                    offset,
                    "First APP0 segment is not a JFIF header",
                ));
            }
        }

        Ok(State::ReadingHeaders)
    }

    fn read_next_segment(&mut self) -> Result<State> {
        let marker = read_any_marker(&mut self.reader)?;
        let offset = self.reader.position() - 2;
        debug!(offset, ?marker, "reading segment");

        match marker.segment_kind() {
            SegmentKind::StartOfImage => {
                return Err(Error::malformed(marker, offset, "Unexpected second SOI marker"));
            }
            SegmentKind::EndOfImage => {
                return Err(Error::malformed(
                    marker,
                    offset,
                    "Unexpected EOI marker encountered.",
                ));
            }
            SegmentKind::Jfif => self.read_jfif(offset)?,
            SegmentKind::QuantizationTables => {
                let tables = segments::read_quantization_tables(&mut self.reader)?;
                self.record_length(marker, offset);
                for table in tables {
                    self.result.quant_tables.insert(table.destination_id, table);
                }
            }
            SegmentKind::StartOfFrame => {
                if self.result.frame.is_some() {
                    return Err(Error::malformed(marker, offset, "Duplicate start of frame"));
                }
                let frame = segments::read_start_of_frame(&mut self.reader, marker)?;
                self.record(marker, offset, Some(frame.length));
                self.result.frame = Some(frame);
            }
            SegmentKind::RestartInterval => {
                let interval = segments::read_restart_interval(&mut self.reader)?;
                self.record(marker, offset, Some(4));
                self.result.restart_interval = Some(interval);
            }
            SegmentKind::StartOfScan => {
                let scan = segments::read_start_of_scan(&mut self.reader)?;
                self.record(marker, offset, Some(scan.length));
                self.result.scan = scan;
                self.result.scan_data_offset = self.reader.position();
                return Ok(State::Done);
            }
            SegmentKind::Standalone => self.record(marker, offset, None),
            SegmentKind::Skip => {
                let length = segments::skip_segment(&mut self.reader, marker)?;
                self.record(marker, offset, Some(length));
            }
        }

        Ok(State::ReadingHeaders)
    }

    /// Reads an APP0 body whose marker at `offset` has already been consumed.
    fn read_jfif(&mut self, offset: usize) -> Result<()> {
        let jfif = segments::read_app0(&mut self.reader, self.options.read_thumbnail)?;
        self.record_length(JPEGMarker::APP0, offset);

        if let Some(jfif) = jfif {
            if self.result.jfif.is_some() {
                return Err(Error::malformed(
                    JPEGMarker::APP0,
                    offset,
                    "Duplicate JFIF segment",
                ));
            }
            self.result.jfif = Some(jfif);
        }
        Ok(())
    }

    /// Records a segment whose length is implied by how far the cursor moved past its marker.
    fn record_length(&mut self, marker: JPEGMarker, offset: usize) {
        let length = (self.reader.position() - offset - 2) as u16;
        self.record(marker, offset, Some(length));
    }

    fn record(&mut self, marker: JPEGMarker, offset: usize, length: Option<u16>) {
        self.result.segments.push(SegmentRecord {
            marker,
            offset,
            length,
        });
    }
}
