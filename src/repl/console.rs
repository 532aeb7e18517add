use std::io::{self, BufRead, Write};

/// Line-oriented operator console.
pub struct Console<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    /// Print `prompt` and read one line without its terminator. `None` at end
    /// of input.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (R, W) {
        (self.input, self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lines_then_eof() {
        let mut console = Console::new("first\r\nsecond\n".as_bytes(), Vec::new());
        assert_eq!(console.read_line("> ").unwrap().as_deref(), Some("first"));
        assert_eq!(console.read_line("> ").unwrap().as_deref(), Some("second"));
        assert_eq!(console.read_line("> ").unwrap(), None);

        let (_, out) = console.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "> > > ");
    }
}
