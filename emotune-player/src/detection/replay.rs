//! Replay of recorded classifier output
//!
//! Reads JSON lines, one line per poll tick:
//!
//! ```text
//! {"happy": 0.7, "sad": 0.1}            one face
//! [{"fear": 0.9}, {"happy": 0.4}]       several faces, the first is used
//! null                                  no face ({} and [] also mean no face)
//! ```
//!
//! Blank lines are skipped.

use std::path::{Path, PathBuf};

use emotune_common::ExpressionScores;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::detection::{Detection, ExpressionSource};
use crate::error::{Error, Result};

type LineReader = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Detection source replaying JSON lines from a file, stdin or any reader
pub struct ReplaySource {
    lines: LineReader,
    /// File to reopen at end of input when looping
    loop_path: Option<PathBuf>,
    line_number: usize,
    /// Ticks produced since the input was last (re)opened
    produced: usize,
}

impl ReplaySource {
    /// Replay a file. With `looping`, restart from the top at end of file.
    pub async fn open(path: &Path, looping: bool) -> Result<Self> {
        let lines = open_lines(path).await?;
        info!("Replaying detections from {}", path.display());
        Ok(Self {
            lines,
            loop_path: looping.then(|| path.to_path_buf()),
            line_number: 0,
            produced: 0,
        })
    }

    /// Replay standard input
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let boxed: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(reader);
        Self {
            lines: boxed.lines(),
            loop_path: None,
            line_number: 0,
            produced: 0,
        }
    }

    /// Reopen the loop file. False when not looping or the file yielded nothing.
    async fn rewind(&mut self) -> Result<bool> {
        let Some(path) = self.loop_path.clone() else {
            return Ok(false);
        };
        if self.produced == 0 {
            return Ok(false);
        }

        debug!("Restarting replay of {}", path.display());
        self.lines = open_lines(&path).await?;
        self.line_number = 0;
        self.produced = 0;
        Ok(true)
    }
}

async fn open_lines(path: &Path) -> Result<LineReader> {
    let file = File::open(path).await.map_err(|e| {
        Error::Source(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let boxed: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(BufReader::new(file));
    Ok(boxed.lines())
}

impl ExpressionSource for ReplaySource {
    async fn next_detection(&mut self) -> Result<Option<Detection>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                if self.rewind().await? {
                    continue;
                }
                return Ok(None);
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            self.produced += 1;
            let line_number = self.line_number;
            return parse_line(&line).map(Some).map_err(|e| match e {
                Error::Source(msg) => Error::Source(format!("line {}: {}", line_number, msg)),
                other => Error::Source(format!("line {}: {}", line_number, other)),
            });
        }
    }
}

/// Parse one non-blank replay line
pub fn parse_line(line: &str) -> Result<Detection> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| Error::Source(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Array(faces) => match faces.into_iter().next() {
            Some(first) => parse_face(first),
            None => Ok(Detection::NoFace),
        },
        other => parse_face(other),
    }
}

fn parse_face(value: Value) -> Result<Detection> {
    let map = match value {
        Value::Null => return Ok(Detection::NoFace),
        Value::Object(map) if map.is_empty() => return Ok(Detection::NoFace),
        Value::Object(map) => map,
        other => {
            return Err(Error::Source(format!(
                "expected an object of expression scores, got {}",
                other
            )));
        }
    };

    let mut scores = Vec::with_capacity(map.len());
    for (key, score) in map {
        let score = score
            .as_f64()
            .ok_or_else(|| Error::Source(format!("score for '{}' is not a number", key)))?;
        scores.push((key, score as f32));
    }

    Ok(Detection::Face(ExpressionScores::new(scores)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotune_common::{select_dominant, EmotionLabel, Expression};

    fn dominant(detection: &Detection) -> Expression {
        match detection {
            Detection::Face(scores) => select_dominant(scores).0.clone(),
            Detection::NoFace => panic!("expected a face"),
        }
    }

    #[test]
    fn test_single_face_object() {
        let d = parse_line(r#"{"anger":0.1,"happy":0.7,"sad":0.05}"#).unwrap();
        assert_eq!(dominant(&d), Expression::Known(EmotionLabel::Happy));
    }

    #[test]
    fn test_first_face_of_array_is_used() {
        let d = parse_line(r#"[{"fear":0.9,"happy":0.1},{"happy":1.0}]"#).unwrap();
        assert_eq!(dominant(&d), Expression::Known(EmotionLabel::Fear));
    }

    #[test]
    fn test_no_face_shapes() {
        for line in ["null", "{}", "[]", "[null]"] {
            assert_eq!(parse_line(line).unwrap(), Detection::NoFace, "line {}", line);
        }
    }

    #[test]
    fn test_malformed_lines_are_errors() {
        for line in ["{", "42", r#"{"happy":"high"}"#, r#"{"happy":2.0}"#, r#"["x"]"#] {
            assert!(parse_line(line).is_err(), "line {}", line);
        }
    }

    #[tokio::test]
    async fn test_reader_skips_blank_lines_and_ends() {
        let input = "{\"sad\":0.8}\n\n   \nnull\n";
        let mut source = ReplaySource::from_reader(BufReader::new(input.as_bytes()));

        let first = source.next_detection().await.unwrap().unwrap();
        assert_eq!(dominant(&first), Expression::Known(EmotionLabel::Sad));
        assert_eq!(source.next_detection().await.unwrap(), Some(Detection::NoFace));
        assert_eq!(source.next_detection().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_error_reports_line_number() {
        let input = "null\nnot json\n";
        let mut source = ReplaySource::from_reader(BufReader::new(input.as_bytes()));

        source.next_detection().await.unwrap();
        let err = source.next_detection().await.unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
    }
}
