
pub mod demux;
pub mod mux;

pub use self::demux::{ParseError, WavDemuxer};
pub use self::mux::write_wav;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_MAGIC: &[u8; 4] = b"WAVE";
const FMT_CHUNK: &[u8; 4] = b"fmt ";
const LIST_CHUNK: &[u8; 4] = b"LIST";
const DATA_CHUNK: &[u8; 4] = b"data";

/// Linear PCM, the only data format code accepted.
const FORMAT_PCM: u16 = 1;

/// Length of the fmt chunk body up to and including bits-per-sample.
const FORMAT_CHUNK_LENGTH: u32 = 16;
