use std::io::Write;

use tickerdesk_core::StreamEvent;

use crate::error::CliError;
use crate::metadata::Envelope;

/// Write an envelope to stdout as one JSON document.
pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, envelope)?;
    } else {
        serde_json::to_writer(&mut stdout, envelope)?;
    }
    writeln!(stdout)?;
    Ok(())
}

/// Prints chat tokens as they arrive.
pub struct TokenWriter<W: Write> {
    out: W,
    answer: String,
}

impl<W: Write> TokenWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            answer: String::new(),
        }
    }

    /// Handle one event; returns the final answer on `Done`.
    pub fn write_event(&mut self, event: StreamEvent) -> Result<Option<String>, CliError> {
        match event {
            StreamEvent::Token { content } => {
                self.out.write_all(content.as_bytes())?;
                self.out.flush()?;
                self.answer.push_str(&content);
                Ok(None)
            }
            StreamEvent::Done { content } => {
                writeln!(self.out)?;
                self.out.flush()?;
                // The completion carries the full answer when the backend sends one.
                let answer = if content.is_empty() {
                    std::mem::take(&mut self.answer)
                } else {
                    content
                };
                Ok(Some(answer))
            }
            StreamEvent::Error { message } => {
                writeln!(self.out)?;
                Err(CliError::Stream(message))
            }
        }
    }

    /// Terminate a partially printed line, e.g. after cancellation.
    pub fn finish(&mut self) -> Result<(), CliError> {
        if !self.answer.is_empty() {
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
