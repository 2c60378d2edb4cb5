use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::{DATA_CHUNK, FMT_CHUNK, FORMAT_CHUNK_LENGTH, FORMAT_PCM, RIFF_MAGIC, WAVE_MAGIC};

/// Write a canonical mono 16-bit PCM WAV stream: RIFF header, 16-byte fmt
/// chunk, then a single data chunk holding all samples.
pub fn write_wav<W: Write>(writer: &mut W, sample_rate_hz: u32, samples: &[i16]) -> io::Result<()> {
    let data_length = (samples.len() * 2) as u32;

    writer.write_all(RIFF_MAGIC)?;
    writer.write_u32::<LittleEndian>(4 + 8 + FORMAT_CHUNK_LENGTH + 8 + data_length)?;
    writer.write_all(WAVE_MAGIC)?;

    writer.write_all(FMT_CHUNK)?;
    writer.write_u32::<LittleEndian>(FORMAT_CHUNK_LENGTH)?;
    writer.write_u16::<LittleEndian>(FORMAT_PCM)?;
    writer.write_u16::<LittleEndian>(1)?; // channels
    writer.write_u32::<LittleEndian>(sample_rate_hz)?;
    writer.write_u32::<LittleEndian>(sample_rate_hz * 2)?; // byte rate
    writer.write_u16::<LittleEndian>(2)?; // block alignment
    writer.write_u16::<LittleEndian>(16)?; // bits per sample

    writer.write_all(DATA_CHUNK)?;
    writer.write_u32::<LittleEndian>(data_length)?;
    for &sample in samples {
        writer.write_i16::<LittleEndian>(sample)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_sizes_match_payload() {
        let mut bytes = Vec::new();
        write_wav(&mut bytes, 11000, &[1, 2, 3, 4]).unwrap();

        assert_eq!(bytes.len(), 12 + 8 + 16 + 8 + 8);

        let riff_length = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(riff_length as usize, bytes.len() - 8);

        let data_offset = bytes.len() - 8 - 8;
        assert_eq!(&bytes[data_offset..data_offset + 4], b"data");
        let data_length = u32::from_le_bytes([
            bytes[data_offset + 4],
            bytes[data_offset + 5],
            bytes[data_offset + 6],
            bytes[data_offset + 7],
        ]);
        assert_eq!(data_length, 8);
    }
}
