use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::detector::dtmf::DtmfDetector;
use crate::source::{AudioStream, ExtractError, ExtractOptions, DECODER_SAMPLE_RATE_HZ};

mod detector;
mod generator;
mod source;
mod wav;

/// Samples per detection window. The detector threshold is calibrated for
/// this window length; neither may change without re-deriving the other.
const WINDOW_SAMPLES: usize = 1024;

#[derive(Parser)]
#[clap(author, version, about, long_about=None)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub(crate) struct ScanArgs {
    /// Media file to scan for DTMF tones.
    #[clap(parse(from_os_str))]
    pub input: PathBuf,
}

#[derive(Args)]
pub(crate) struct DumpArgs {
    /// Media file whose decoded samples to print.
    #[clap(parse(from_os_str))]
    pub input: PathBuf,
}

#[derive(Args)]
pub(crate) struct SynthArgs {
    /// Key sequence to synthesize, e.g. "0423#".
    pub symbols: String,

    /// Output WAV file.
    #[clap(parse(from_os_str))]
    pub output: PathBuf,

    /// Tone duration per symbol, in milliseconds.
    #[clap(long, default_value_t = 100)]
    pub tone_ms: u32,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Detect DTMF keys in the audio track of a media file.
    #[clap(name="scan")]
    Scan(ScanArgs),

    /// Print decoded samples, one per line, with per-window counts.
    #[clap(name="dump")]
    Dump(DumpArgs),

    /// Write a WAV file containing a DTMF key sequence.
    #[clap(name="synth")]
    Synth(SynthArgs),
}

fn main() -> Result<(), ExtractError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Cli::parse();

    match args.command {
        Commands::Scan(a) => scan(&ExtractOptions { input: a.input }),
        Commands::Dump(a) => dump(&ExtractOptions { input: a.input }),
        Commands::Synth(a) => synth(&a),
    }
}

fn scan(options: &ExtractOptions) -> Result<(), ExtractError> {
    let mut stream = AudioStream::open(options)?;
    match scan_windows(&mut stream) {
        Ok(()) => stream.close(),
        Err(error) => {
            let _ = stream.close();
            Err(error)
        }
    }
}

fn scan_windows(stream: &mut AudioStream) -> Result<(), ExtractError> {
    let mut window = [0i16; WINDOW_SAMPLES];
    let mut detector: Option<DtmfDetector> = None;
    let mut active = None;
    let mut position_samples = 0u64;

    loop {
        let count = stream.read_samples(&mut window)?;
        if count == 0 {
            return Ok(());
        }

        if count < WINDOW_SAMPLES {
            // The detection threshold is only meaningful at the full
            // window length, so the trailing partial window is dropped.
            debug!(count, "partial trailing window, not classified");
            position_samples += count as u64;
            continue;
        }

        let sample_rate = match stream.sample_rate() {
            Some(sample_rate) => sample_rate,
            // A successful read implies the header has been parsed.
            None => unreachable!(),
        };
        let detector = detector.get_or_insert_with(|| DtmfDetector::new(sample_rate as f32));

        let symbol = detector.classify(&window);
        if symbol != active {
            if let Some(key) = symbol {
                let seconds = position_samples as f64 / f64::from(sample_rate);
                println!("{seconds:8.2}  {}", style(key).green().bold());
            }
            active = symbol;
        }
        position_samples += count as u64;
    }
}

fn dump(options: &ExtractOptions) -> Result<(), ExtractError> {
    let mut stream = AudioStream::open(options)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let result = dump_windows(&mut stream, &mut out)
        .and_then(|()| out.flush().map_err(ExtractError::from));
    match result {
        Ok(()) => stream.close(),
        Err(error) => {
            let _ = stream.close();
            Err(error)
        }
    }
}

fn dump_windows(stream: &mut AudioStream, out: &mut impl Write) -> Result<(), ExtractError> {
    let mut window = [0i16; WINDOW_SAMPLES];
    loop {
        let count = stream.read_samples(&mut window)?;
        if count == 0 {
            return Ok(());
        }
        writeln!(out, "got {count}")?;
        for sample in &window[..count] {
            writeln!(out, "{sample}")?;
        }
    }
}

fn synth(args: &SynthArgs) -> Result<(), ExtractError> {
    let sample_rate = DECODER_SAMPLE_RATE_HZ;
    let tone_samples = (u64::from(sample_rate) * u64::from(args.tone_ms) / 1000) as usize;
    let gap_samples = tone_samples / 2;

    let mut samples = Vec::new();
    for symbol in args.symbols.chars() {
        let symbol = symbol.to_ascii_uppercase();
        let tone = generator::synthesize_symbol(symbol, sample_rate as f32, tone_samples)
            .ok_or_else(|| {
                ExtractError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a DTMF key: {symbol:?}"),
                ))
            })?;
        samples.extend_from_slice(&tone);
        samples.extend(std::iter::repeat(0).take(gap_samples));
    }

    let file = File::create(&args.output)?;
    let mut writer = BufWriter::new(file);
    wav::write_wav(&mut writer, sample_rate, &samples)?;
    writer.flush()?;

    debug!(symbols = %args.symbols, output = %args.output.display(), "sequence written");
    Ok(())
}
