use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

use super::Snapshot;

/// How snapshots get written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    /// A single status line rewritten in place on every tick.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown render format `{other}`, expected text or json")),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Writes snapshots to an output stream.
pub struct Renderer<W: Write> {
    format: RenderFormat,
    out: W,
    /// Whether a text status line was written and not terminated yet.
    open_line: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(format: RenderFormat, out: W) -> Self {
        Self {
            format,
            out,
            open_line: false,
        }
    }

    /// Writes an intermediate snapshot.
    pub fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        match self.format {
            RenderFormat::Text => {
                write!(self.out, "\r{snapshot}\x1b[K")?;
                self.open_line = true;
            }
            RenderFormat::Json => self.write_json(snapshot)?,
        }

        self.out.flush()
    }

    /// Writes the last snapshot of the run, terminating the status line.
    pub fn finish(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        match self.format {
            RenderFormat::Text => {
                writeln!(self.out, "\r{snapshot}\x1b[K")?;
                self.open_line = false;
            }
            RenderFormat::Json => self.write_json(snapshot)?,
        }

        self.out.flush()
    }

    /// Terminates the status line of a run that stopped before reaching its goal.
    ///
    /// Writes nothing if no line is left open.
    pub fn abort(&mut self) -> io::Result<()> {
        if !self.open_line {
            return Ok(());
        }

        writeln!(self.out)?;
        self.open_line = false;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_json(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        writeln!(self.out)
    }
}
