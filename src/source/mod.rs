use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::wav::{ParseError, WavDemuxer};

/// Sample rate the decoder is asked to resample to.
pub const DECODER_SAMPLE_RATE_HZ: u32 = 11_000;

const DECODER_PROGRAM: &str = "ffmpeg";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("spawning {DECODER_PROGRAM}: {0}")]
    Spawn(#[source] io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("audio stream read: {0}")]
    Io(#[from] io::Error),
}

/// Resolved program configuration handed to `AudioStream::open`.
pub struct ExtractOptions {
    pub input: PathBuf,
}

enum HeaderState {
    Pending,
    Ready { sample_rate: u32 },
    Failed(ParseError),
}

/// Sample-granularity pull adapter over a WAV byte stream. Parses the
/// container header on first use; a header failure is sticky and reported
/// identically on every subsequent read.
struct SampleSource<R> {
    demux: WavDemuxer<R>,
    header: HeaderState,
}

impl<R: Read> SampleSource<R> {
    fn new(reader: R) -> Self {
        Self {
            demux: WavDemuxer::new(reader),
            header: HeaderState::Pending,
        }
    }

    fn sample_rate(&self) -> Option<u32> {
        match self.header {
            HeaderState::Ready { sample_rate } => Some(sample_rate),
            _ => None,
        }
    }

    fn ensure_header(&mut self) -> Result<(), ExtractError> {
        match &self.header {
            HeaderState::Ready { .. } => Ok(()),
            HeaderState::Failed(error) => Err(error.clone().into()),
            HeaderState::Pending => match self.demux.read_header() {
                Ok(sample_rate) => {
                    self.header = HeaderState::Ready { sample_rate };
                    Ok(())
                }
                Err(error) => {
                    self.header = HeaderState::Failed(error.clone());
                    Err(error.into())
                }
            },
        }
    }

    fn read_samples(&mut self, samples: &mut [i16]) -> Result<usize, ExtractError> {
        self.ensure_header()?;
        Ok(self.demux.read_samples(samples)?)
    }
}

/// One open decode session: the external decoder process and the demuxed
/// sample stream coming out of it. Exclusively owned; `close` consumes the
/// stream, so releasing it twice is unrepresentable.
pub struct AudioStream {
    child: Child,
    source: SampleSource<BufReader<ChildStdout>>,
}

impl AudioStream {
    /// Spawn the decoder against the configured input and wire its standard
    /// output into a demuxer. The invocation drops video and mixes down to
    /// a single channel, so the pipe carries exactly one WAV PCM stream.
    pub fn open(options: &ExtractOptions) -> Result<Self, ExtractError> {
        let mut child = Command::new(DECODER_PROGRAM)
            .arg("-i")
            .arg(&options.input)
            .args(["-vn", "-ar"])
            .arg(DECODER_SAMPLE_RATE_HZ.to_string())
            .args(["-ac", "1", "-f", "wav", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ExtractError::Spawn)?;

        let stdout = child.stdout.take().expect("stdout is piped");
        debug!(input = %options.input.display(), pid = child.id(), "decoder spawned");

        Ok(Self {
            child,
            source: SampleSource::new(BufReader::new(stdout)),
        })
    }

    /// Sample rate reported by the container's fmt chunk, known once the
    /// header has been parsed by the first read.
    pub fn sample_rate(&self) -> Option<u32> {
        self.source.sample_rate()
    }

    /// Read up to `samples.len()` samples. `Ok(0)` is clean end-of-stream
    /// (the decoder exited and the pipe drained).
    pub fn read_samples(&mut self, samples: &mut [i16]) -> Result<usize, ExtractError> {
        self.source.read_samples(samples)
    }

    /// Release the byte stream and reap the decoder. Dropping the read side
    /// first means a decoder that is still producing dies on its next write
    /// instead of keeping the wait blocked.
    pub fn close(self) -> Result<(), ExtractError> {
        let Self { mut child, source } = self;
        drop(source);
        let status = child.wait()?;
        debug!(%status, "decoder exited");
        Ok(())
    }
}
