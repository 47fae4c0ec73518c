
use std::io::{self, BufRead};

/// Tracks the current line number while parsing.
///
/// This is primarily used to add line-context to I/O and parse errors.
#[derive(Debug, Clone, Copy)]
pub struct LocationTracker {
    /// Current 1-based line index in the input stream.
    pub line_index: usize,
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationTracker {
    /// Creates a new tracker at the start of a stream.
    pub fn new() -> Self {
        LocationTracker { line_index: 0 }
    }

    /// Advances the tracker to the next line.
    pub fn next_line(&mut self) {
        self.line_index += 1;
    }
}

/// Reads one logical line from `reader` into `buf` (cleared first),
/// accepting `\n`, `\r\n`, or a lone `\r` as the terminator. The terminator
/// itself is not included in `buf`. Returns the number of input bytes
/// consumed, including the terminator; `0` signals end of input. Shared by
/// the header codec and the ASCII body codec, both of which need the same
/// line-ending leniency (spec §4.4/§4.7/§6).
pub fn read_raw_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    let mut total = 0usize;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(total);
        }
        if let Some(pos) = available.iter().position(|&b| b == b'\n' || b == b'\r') {
            buf.extend_from_slice(&available[..pos]);
            let terminator = available[pos];
            let consumed = pos + 1;
            reader.consume(consumed);
            total += consumed;
            if terminator == b'\r' {
                let next = reader.fill_buf()?;
                if next.first() == Some(&b'\n') {
                    reader.consume(1);
                    total += 1;
                }
            }
            return Ok(total);
        }
        let n = available.len();
        buf.extend_from_slice(available);
        reader.consume(n);
        total += n;
    }
}
