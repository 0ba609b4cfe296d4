use anyhow::{Context, Result};
use facematch_core::Embedding;
use log::warn;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One observation from the embedding producer
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Face(Embedding),
    NoFace,
}

/// Supplies query embeddings to the watch loop. `None` means no more frames.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<I: Iterator<Item = Frame>> FrameSource for I {
    fn next_frame(&mut self) -> Option<Frame> {
        self.next()
    }
}

/// Parse an embedding given either inline (`[0.1, 0.2]`) or as a path to a
/// JSON file holding the array.
pub fn parse_embedding(arg: &str) -> Result<Embedding> {
    let raw = if arg.trim_start().starts_with('[') {
        arg.to_string()
    } else {
        std::fs::read_to_string(arg)
            .with_context(|| format!("reading embedding file {}", arg))?
    };
    let values: Vec<f32> = serde_json::from_str(&raw).context("parsing embedding JSON")?;
    Ok(Embedding::new(values)?)
}

fn parse_frame(line: &str) -> Result<Frame> {
    let values: Option<Vec<f32>> = serde_json::from_str(line).context("parsing JSON")?;
    Ok(match values {
        Some(v) => Frame::Face(Embedding::new(v)?),
        None => Frame::NoFace,
    })
}

/// Frames read lazily from JSON lines: each line is an embedding array, or
/// `null` when no face was seen.
///
/// One line is parsed per frame, so a live producer (a pipe, stdin) can be
/// followed. Blank lines are skipped. A malformed line is logged and skipped;
/// a read error ends the source.
pub struct JsonLinesSource<R> {
    reader: R,
    line_no: usize,
    skipped: usize,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            skipped: 0,
            buf: String::new(),
        }
    }

    /// Lines dropped because they did not parse
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl JsonLinesSource<Box<dyn BufRead>> {
    /// Open `path`, or standard input when `path` is `-`
    pub fn open(path: &Path) -> Result<Self> {
        let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
            Box::new(BufReader::new(std::io::stdin()))
        } else {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("Reading line {}: {}", self.line_no + 1, e);
                    return None;
                }
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            match parse_frame(line) {
                Ok(frame) => return Some(frame),
                Err(e) => {
                    warn!("Skipping line {}: {:#}", self.line_no, e);
                    self.skipped += 1;
                }
            }
        }
    }
}
