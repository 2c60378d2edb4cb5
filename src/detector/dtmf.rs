use super::goertzel::Goertzel;

pub const ROW_FREQUENCIES_HZ: [f32; 4] = [697.0, 770.0, 852.0, 941.0];
pub const COLUMN_FREQUENCIES_HZ: [f32; 4] = [1209.0, 1336.0, 1477.0, 1633.0];

static KEY_MAP: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

/// Classifies fixed-length sample windows into DTMF keys by probing the
/// four row and four column frequencies with one Goertzel detector each.
pub struct DtmfDetector {
    rows: [Goertzel; 4],
    columns: [Goertzel; 4],
}

impl DtmfDetector {
    pub fn new(sample_rate_hz: f32) -> Self {
        Self {
            rows: ROW_FREQUENCIES_HZ.map(|frequency| Goertzel::new(frequency, sample_rate_hz)),
            columns: COLUMN_FREQUENCIES_HZ.map(|frequency| Goertzel::new(frequency, sample_rate_hz)),
        }
    }

    /// Classify one window. The first row that detects selects the row;
    /// within it, the first column that detects selects the key. Rows are
    /// mutually exclusive in the tone plan, so no further row is consulted
    /// once one has fired.
    pub fn classify(&self, window: &[i16]) -> Option<char> {
        let row = self.rows.iter().position(|detector| detector.detect(window))?;
        let column = self
            .columns
            .iter()
            .position(|detector| detector.detect(window))?;
        Some(KEY_MAP[row][column])
    }
}

/// (row, column) frequency pair for a keypad symbol.
pub fn tone_pair(symbol: char) -> Option<(f32, f32)> {
    for (row, keys) in KEY_MAP.iter().enumerate() {
        for (column, &key) in keys.iter().enumerate() {
            if key == symbol {
                return Some((ROW_FREQUENCIES_HZ[row], COLUMN_FREQUENCIES_HZ[column]));
            }
        }
    }
    None
}
