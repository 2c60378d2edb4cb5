use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;
use tracing::debug;

use super::{DATA_CHUNK, FMT_CHUNK, FORMAT_CHUNK_LENGTH, FORMAT_PCM, LIST_CHUNK, RIFF_MAGIC, WAVE_MAGIC};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("not a RIFF stream")]
    BadRiffMagic,
    #[error("RIFF form type is not WAVE")]
    BadFormType,
    #[error("fmt chunk of {0} bytes is too short")]
    MalformedFormatChunk(u32),
    #[error("data format code {0}, only linear PCM is supported")]
    UnsupportedFormat(u16),
    #[error("{0} channels, only mono is supported")]
    UnsupportedChannels(u16),
    #[error("{0} bits per sample, only 16 is supported")]
    UnsupportedBitDepth(u16),
    #[error("data chunk reached before fmt chunk")]
    MissingFormat,
    #[error("unrecognized chunk id {0:?}")]
    UnknownChunk([u8; 4]),
    #[error("container header read failed: {0:?}")]
    Read(io::ErrorKind),
}

impl From<io::Error> for ParseError {
    fn from(error: io::Error) -> Self {
        ParseError::Read(error.kind())
    }
}

enum DemuxState {
    AwaitingRiff,
    AwaitingChunk { sample_rate: Option<u32> },
    Ready { sample_rate: u32 },
}

/// Pull parser for the RIFF/WAVE container framing in front of a PCM
/// sample payload. `read_header` consumes chunks until the data chunk is
/// reached; after that the demuxer is a plain little-endian int16 sample
/// reader.
///
/// Only the chunk types the canonical decoder output contains are
/// understood: fmt and LIST may appear in either order before data, and
/// anything else is an error rather than skipped.
pub struct WavDemuxer<R> {
    reader: R,
    state: DemuxState,
    scratch: Vec<u8>,
}

impl<R: Read> WavDemuxer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: DemuxState::AwaitingRiff,
            scratch: Vec::new(),
        }
    }

    /// Consume container chunks until positioned at the start of sample
    /// data. Returns the sample rate reported by the fmt chunk.
    pub fn read_header(&mut self) -> Result<u32, ParseError> {
        loop {
            match self.state {
                DemuxState::AwaitingRiff => {
                    let mut header = [0u8; 12];
                    self.reader.read_exact(&mut header)?;
                    if &header[0..4] != RIFF_MAGIC {
                        return Err(ParseError::BadRiffMagic);
                    }
                    // Bytes 4..8 hold the container size, which is not
                    // validated against the actual stream length.
                    if &header[8..12] != WAVE_MAGIC {
                        return Err(ParseError::BadFormType);
                    }
                    self.state = DemuxState::AwaitingChunk { sample_rate: None };
                }
                DemuxState::AwaitingChunk { sample_rate } => {
                    let mut id = [0u8; 4];
                    self.reader.read_exact(&mut id)?;
                    match &id {
                        FMT_CHUNK => {
                            let sample_rate = self.read_format_chunk()?;
                            self.state = DemuxState::AwaitingChunk {
                                sample_rate: Some(sample_rate),
                            };
                        }
                        LIST_CHUNK => {
                            let length = self.reader.read_u32::<LittleEndian>()?;
                            debug!(length, "skipping LIST chunk");
                            self.skip(u64::from(length))?;
                        }
                        DATA_CHUNK => {
                            // The declared data length is not used to bound
                            // the payload; samples run to end of stream.
                            let _length = self.reader.read_u32::<LittleEndian>()?;
                            let sample_rate = sample_rate.ok_or(ParseError::MissingFormat)?;
                            self.state = DemuxState::Ready { sample_rate };
                            return Ok(sample_rate);
                        }
                        _ => return Err(ParseError::UnknownChunk(id)),
                    }
                }
                DemuxState::Ready { sample_rate } => return Ok(sample_rate),
            }
        }
    }

    fn read_format_chunk(&mut self) -> Result<u32, ParseError> {
        let length = self.reader.read_u32::<LittleEndian>()?;
        if length < FORMAT_CHUNK_LENGTH {
            return Err(ParseError::MalformedFormatChunk(length));
        }

        let format = self.reader.read_u16::<LittleEndian>()?;
        if format != FORMAT_PCM {
            return Err(ParseError::UnsupportedFormat(format));
        }
        let channels = self.reader.read_u16::<LittleEndian>()?;
        if channels != 1 {
            return Err(ParseError::UnsupportedChannels(channels));
        }
        let sample_rate = self.reader.read_u32::<LittleEndian>()?;
        let _byte_rate = self.reader.read_u32::<LittleEndian>()?;
        let _block_align = self.reader.read_u16::<LittleEndian>()?;
        let bits_per_sample = self.reader.read_u16::<LittleEndian>()?;
        if bits_per_sample != 16 {
            return Err(ParseError::UnsupportedBitDepth(bits_per_sample));
        }

        // Extension bytes past the fields above are not interesting.
        self.skip(u64::from(length - FORMAT_CHUNK_LENGTH))?;

        debug!(sample_rate, "fmt chunk validated");
        Ok(sample_rate)
    }

    fn skip(&mut self, length: u64) -> Result<(), ParseError> {
        let skipped = io::copy(&mut self.reader.by_ref().take(length), &mut io::sink())?;
        if skipped != length {
            return Err(ParseError::Read(io::ErrorKind::UnexpectedEof));
        }
        Ok(())
    }

    /// Read up to `samples.len()` samples from the data payload. Returns
    /// the number of samples read; 0 is clean end-of-stream. A trailing
    /// odd byte immediately before end-of-stream is discarded so that a
    /// half-sample is never emitted.
    pub fn read_samples(&mut self, samples: &mut [i16]) -> io::Result<usize> {
        if !matches!(self.state, DemuxState::Ready { .. }) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "container header not consumed",
            ));
        }

        let wanted = samples.len() * 2;
        self.scratch.resize(wanted, 0);

        let mut filled = 0;
        while filled < wanted {
            match self.reader.read(&mut self.scratch[filled..wanted]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let count = filled / 2;
        for (sample, pair) in samples[..count]
            .iter_mut()
            .zip(self.scratch[..count * 2].chunks_exact(2))
        {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::super::write_wav;
    use super::*;
    use crate::detector::dtmf::DtmfDetector;
    use crate::generator::synthesize_symbol;

    fn demuxer(bytes: Vec<u8>) -> WavDemuxer<Cursor<Vec<u8>>> {
        WavDemuxer::new(Cursor::new(bytes))
    }

    fn riff_prefix() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes
    }

    fn fmt_chunk(format: u16, channels: u16, sample_rate: u32, bits_per_sample: u16) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&format.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
        bytes
    }

    fn list_chunk(length: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&length.to_le_bytes());
        bytes.extend(std::iter::repeat(0x49).take(length as usize));
        bytes
    }

    fn data_chunk(payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn reports_embedded_sample_rate_exactly() {
        for sample_rate in [11000u32, 22050] {
            let mut bytes = Vec::new();
            write_wav(&mut bytes, sample_rate, &[0, 1, -1]).unwrap();
            assert_eq!(demuxer(bytes).read_header(), Ok(sample_rate));
        }
    }

    #[test]
    fn rejects_bad_magic_and_form_type() {
        let mut bytes = riff_prefix();
        bytes[0..4].copy_from_slice(b"RIFX");
        assert_eq!(demuxer(bytes).read_header(), Err(ParseError::BadRiffMagic));

        let mut bytes = riff_prefix();
        bytes[8..12].copy_from_slice(b"AVI ");
        assert_eq!(demuxer(bytes).read_header(), Err(ParseError::BadFormType));
    }

    #[test]
    fn rejects_unsupported_format_fields() {
        let cases = [
            (fmt_chunk(6, 1, 11000, 16), ParseError::UnsupportedFormat(6)),
            (fmt_chunk(1, 2, 11000, 16), ParseError::UnsupportedChannels(2)),
            (fmt_chunk(1, 1, 11000, 8), ParseError::UnsupportedBitDepth(8)),
        ];
        for (fmt, expected) in cases {
            let mut bytes = riff_prefix();
            bytes.extend_from_slice(&fmt);
            bytes.extend_from_slice(&data_chunk(&[]));
            assert_eq!(demuxer(bytes).read_header(), Err(expected));
        }
    }

    #[test]
    fn recognized_chunks_parse_in_either_order() {
        let mut list_first = riff_prefix();
        list_first.extend_from_slice(&list_chunk(26));
        list_first.extend_from_slice(&fmt_chunk(1, 1, 11000, 16));
        list_first.extend_from_slice(&data_chunk(&[]));
        assert_eq!(demuxer(list_first).read_header(), Ok(11000));

        let mut fmt_first = riff_prefix();
        fmt_first.extend_from_slice(&fmt_chunk(1, 1, 11000, 16));
        fmt_first.extend_from_slice(&list_chunk(26));
        fmt_first.extend_from_slice(&data_chunk(&[]));
        assert_eq!(demuxer(fmt_first).read_header(), Ok(11000));
    }

    #[test]
    fn rejects_unrecognized_chunk_id() {
        let mut bytes = riff_prefix();
        bytes.extend_from_slice(b"JUNK");
        bytes.extend_from_slice(&8u32.to_le_bytes());
        assert_eq!(
            demuxer(bytes).read_header(),
            Err(ParseError::UnknownChunk(*b"JUNK"))
        );
    }

    #[test]
    fn rejects_data_before_fmt() {
        let mut bytes = riff_prefix();
        bytes.extend_from_slice(&data_chunk(&[0, 0]));
        assert_eq!(demuxer(bytes).read_header(), Err(ParseError::MissingFormat));
    }

    #[test]
    fn rejects_truncated_list_chunk() {
        let mut bytes = riff_prefix();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 10]);
        assert_eq!(
            demuxer(bytes).read_header(),
            Err(ParseError::Read(io::ErrorKind::UnexpectedEof))
        );
    }

    #[test]
    fn sample_counts_sum_to_payload_and_drop_trailing_odd_byte() {
        let mut bytes = Vec::new();
        write_wav(&mut bytes, 11000, &[10, -20, 30]).unwrap();
        // An odd trailing byte past the declared data length; the payload
        // is read to end of stream, so this lands in sample territory.
        bytes.push(0xaa);

        let mut demux = demuxer(bytes);
        demux.read_header().unwrap();

        let mut buffer = [0i16; 2];
        let mut collected = Vec::new();
        loop {
            let count = demux.read_samples(&mut buffer).unwrap();
            if count == 0 {
                break;
            }
            collected.extend_from_slice(&buffer[..count]);
        }
        assert_eq!(collected, vec![10, -20, 30]);
    }

    #[test]
    fn demuxes_and_classifies_synthesized_tone_sequence() {
        const WINDOW_SAMPLES: usize = 1024;

        let mut samples = synthesize_symbol('5', 11000.0, WINDOW_SAMPLES).unwrap();
        samples.extend(std::iter::repeat(0).take(WINDOW_SAMPLES));

        let mut bytes = Vec::new();
        write_wav(&mut bytes, 11000, &samples).unwrap();

        let mut demux = demuxer(bytes);
        let sample_rate = demux.read_header().unwrap();
        assert_eq!(sample_rate, 11000);

        let detector = DtmfDetector::new(sample_rate as f32);
        let mut window = [0i16; WINDOW_SAMPLES];
        let mut symbols = Vec::new();
        loop {
            let count = demux.read_samples(&mut window).unwrap();
            if count == 0 {
                break;
            }
            assert_eq!(count, WINDOW_SAMPLES);
            symbols.push(detector.classify(&window));
        }
        assert_eq!(symbols, vec![Some('5'), None]);
    }
}
