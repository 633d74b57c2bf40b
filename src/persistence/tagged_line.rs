pub const TAG_WIDTH: usize = 4;
pub const LONG_TEXT_END: char = '~';

/// Splits a record line into its 4-byte tag and the value after it. One `:`
/// and the spaces following it are skipped. Lines too short to carry a tag
/// come back as `("", line)`.
pub fn decode(line: &str) -> (&str, &str) {
    match (line.get(..TAG_WIDTH), line.get(TAG_WIDTH..)) {
        (Some(tag), Some(rest)) => {
            let rest = rest.strip_prefix(':').unwrap_or(rest);
            (tag, rest.trim_start_matches(' '))
        }
        _ => ("", line),
    }
}

pub fn encode(tag: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{tag}:")
    } else {
        format!("{tag}: {value}")
    }
}

/// Line source for record and index files.
pub struct LineReader<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
    pending: Option<&'a str>,
}

impl<'a> LineReader<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            lines: data.lines(),
            line_number: 0,
            pending: None,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next meaningful line; blank lines and `*` comments are skipped.
    pub fn next_line(&mut self) -> Option<&'a str> {
        loop {
            let line = self.next_raw_line()?;
            if line.trim().is_empty() || line.starts_with('*') {
                continue;
            }
            return Some(line);
        }
    }

    pub fn next_raw_line(&mut self) -> Option<&'a str> {
        if let Some(line) = self.pending.take() {
            return Some(line);
        }
        let line = self.lines.next()?;
        self.line_number += 1;
        Some(line.trim_end_matches('\r'))
    }

    /// Hands `line` back so the next read returns it again. Only the line
    /// just read may be pushed back; `line_number` still refers to it.
    pub fn push_back(&mut self, line: &'a str) {
        self.pending = Some(line);
    }

    /// Collects lines up to the `~` terminator. Running out of input ends the
    /// text as well.
    pub fn read_long_text(&mut self) -> String {
        let mut parts = Vec::new();
        while let Some(line) = self.next_raw_line() {
            if let Some(last) = line.strip_suffix(LONG_TEXT_END) {
                if !last.is_empty() {
                    parts.push(last);
                }
                break;
            }
            parts.push(line);
        }
        parts.join("\n")
    }
}

/// Accumulates an output file line by line.
#[derive(Debug, Default)]
pub struct LineWriter {
    out: String,
}

impl LineWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, tag: &str, value: &str) {
        let value = single_line(value);
        self.raw(&encode(tag, &value));
    }

    pub fn header(&mut self, tag: &str) {
        self.raw(&encode(tag, ""));
    }

    pub fn raw(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub fn long_text(&mut self, tag: &str, text: &str) {
        self.header(tag);
        let text: String = text.chars().filter(|ch| *ch != LONG_TEXT_END).collect();
        for line in text.lines() {
            self.raw(line);
        }
        self.raw("~");
    }

    pub fn finish(self) -> String {
        self.out
    }
}

pub(crate) fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect()
}
