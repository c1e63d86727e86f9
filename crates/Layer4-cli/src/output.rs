//! Event rendering

use std::io::{self, Write};
use tasklog_foundation::LogEvent;

/// 출력 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    JsonLines,
}

/// 이벤트 한 줄 렌더링
pub fn format_event(event: &LogEvent, format: OutputFormat) -> String {
    match format {
        OutputFormat::JsonLines => {
            serde_json::to_string(event).unwrap_or_else(|_| format!("{{\"id\":{}}}", event.id))
        }
        OutputFormat::Plain => match event.message() {
            Some(message) => format!("[{}] {:<10} {}", event.id, event.kind, message),
            None if event.payload.is_empty() => format!("[{}] {}", event.id, event.kind),
            None => format!(
                "[{}] {:<10} {}",
                event.id,
                event.kind,
                serde_json::Value::Object(event.payload.clone())
            ),
        },
    }
}

pub struct Printer<W: Write> {
    out: W,
    format: OutputFormat,
}

impl Printer<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self {
            out: io::stdout(),
            format,
        }
    }
}

impl<W: Write> Printer<W> {
    pub fn print(&mut self, event: &LogEvent) -> io::Result<()> {
        writeln!(self.out, "{}", format_event(event, self.format))?;
        self.out.flush()
    }
}
