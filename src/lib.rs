pub mod actuators;
pub mod behaviors;
pub mod clock;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod joint;
pub mod keyboard;
pub mod policy;
pub mod pose;
pub mod session;
pub mod sim;
pub mod task;

#[cfg(test)]
mod testing;

use std::io::{self, Write};
use std::path::Path;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn timer() -> UtcTime<&'static [BorrowedFormatItem<'static>]> {
    UtcTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ))
}

/// Stdout writer that ends lines with `\r\n`. The keyboard puts the
/// terminal in raw mode, which stops it from returning to column 0 on a
/// bare newline.
struct RawModeWriter<W>(W);

impl<W: Write> Write for RawModeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in buf.split_inclusive(|&b| b == b'\n') {
            match line.strip_suffix(b"\n") {
                Some(body) if !body.ends_with(b"\r") => {
                    self.0.write_all(body)?;
                    self.0.write_all(b"\r\n")?;
                }
                _ => self.0.write_all(line)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

fn console() -> RawModeWriter<io::Stdout> {
    RawModeWriter(io::stdout())
}

/// Console logging, filtered by `RUST_LOG` (default `info`).
pub fn initialize_logging() {
    tracing_subscriber::fmt()
        .with_writer(console)
        .with_env_filter(env_filter())
        .with_timer(timer())
        .with_thread_names(true)
        .init();
}

/// Console logging plus a daily rolling log file under `log_dir`.
///
/// The returned guard flushes the file writer when dropped and must be held
/// until the program exits.
pub fn initialize_file_and_console_logging(log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "zbot-behaviors.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(console)
                .with_timer(timer())
                .with_thread_names(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_timer(timer())
                .with_thread_names(true)
                .with_ansi(false),
        )
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn through_console(chunks: &[&[u8]]) -> Vec<u8> {
        let mut writer = RawModeWriter(Vec::new());
        for chunk in chunks {
            assert_eq!(writer.write(chunk).unwrap(), chunk.len());
        }
        writer.0
    }

    #[test]
    fn bare_newlines_get_a_carriage_return() {
        assert_eq!(
            through_console(&[b"Selected walk\nWalk stopped\n"]),
            b"Selected walk\r\nWalk stopped\r\n"
        );
    }

    #[test]
    fn existing_crlf_and_partial_lines_pass_through() {
        assert_eq!(
            through_console(&[b"already\r\n", b"no newline yet", b"\n"]),
            b"already\r\nno newline yet\r\n"
        );
    }
}
