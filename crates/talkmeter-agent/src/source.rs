//! Line-delimited JSON adapter standing in for the voice pipeline.
//!
//! Each non-blank line is one JSON object:
//!
//! ```text
//! {"event":"conversation_start"}
//! {"event":"user_speech_start"}
//! {"event":"pause","duration":1.5}
//! {"event":"request_summary"}
//! ```
//!
//! Lines starting with `#` are comments.

use crate::error::SourceError;
use serde::Deserialize;
use talkmeter_types::ActivityEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// One instruction read from the event source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCommand {
    /// A speech-activity event for the engine.
    Activity(ActivityEvent),
    /// The user asked for their conversation analytics.
    RequestSummary,
}

#[derive(Deserialize)]
struct EventName<'a> {
    #[serde(borrow)]
    event: &'a str,
}

/// Parses one line. Blank and comment lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<SourceCommand>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let name: EventName<'_> = serde_json::from_str(line)?;
    if name.event == "request_summary" {
        return Ok(Some(SourceCommand::RequestSummary));
    }
    serde_json::from_str(line).map(|event| Some(SourceCommand::Activity(event)))
}

/// Reads [`SourceCommand`]s from any buffered async reader.
pub struct ActivitySource<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: AsyncBufRead + Unpin> ActivitySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// Returns the next command, or `None` at end of input.
    ///
    /// A malformed line produces [`SourceError::InvalidLine`]; the source
    /// stays usable and the next call continues with the following line.
    /// Cancel safe.
    pub async fn next_command(&mut self) -> Result<Option<SourceCommand>, SourceError> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            match parse_line(&line) {
                Ok(Some(command)) => return Ok(Some(command)),
                Ok(None) => continue,
                Err(source) => {
                    return Err(SourceError::InvalidLine {
                        line: self.line_number,
                        source,
                    })
                }
            }
        }
        Ok(None)
    }
}
