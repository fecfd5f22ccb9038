use crate::model::Entity;
use crate::output::{EntitySink, SinkResult};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes one tagged JSON object per line
pub struct JsonLinesSink {
    writer: Box<dyn Write + Send>,
    written: u64,
}

impl JsonLinesSink {
    /// Creates a sink writing to `writer`
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            written: 0,
        }
    }

    /// Opens the configured entities path; `-` means stdout
    ///
    /// An existing file is truncated.
    pub fn open(path: &str) -> SinkResult<Self> {
        if path == "-" {
            return Ok(Self::new(io::stdout()));
        }

        let file = File::create(Path::new(path))?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Number of entities written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl EntitySink for JsonLinesSink {
    fn accept(&mut self, entity: &Entity) -> SinkResult<()> {
        serde_json::to_writer(&mut self.writer, entity)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
