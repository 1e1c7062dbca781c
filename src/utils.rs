use anyhow::Result;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::constants::LINE_TERMINATOR;

pub fn setup_logging(verbosity: &str) -> Result<()> {
    let level = match verbosity {
        "silent" => Level::ERROR,
        "normal" => Level::INFO,
        "verbose" => Level::DEBUG,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("ulp_sift={}", level).parse()?);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Counts lines the way the worker reads them: every `\n` ends a line, and trailing bytes
/// without a final newline form one more. Returns `None` if `should_abort` fires first.
pub fn count_lines<F>(file: File, buffer_size: usize, should_abort: F) -> io::Result<Option<u64>>
where
    F: Fn() -> bool,
{
    let mut reader = BufReader::with_capacity(buffer_size, file);
    let mut lines = 0u64;
    let mut last_byte = None;

    loop {
        if should_abort() {
            return Ok(None);
        }

        let buffer = match reader.fill_buf() {
            Ok(buffer) => buffer,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if buffer.is_empty() {
            break;
        }

        lines += buffer.iter().filter(|b| **b == LINE_TERMINATOR).count() as u64;
        last_byte = buffer.last().copied();
        let consumed = buffer.len();
        reader.consume(consumed);
    }

    if matches!(last_byte, Some(b) if b != LINE_TERMINATOR) {
        lines += 1;
    }

    Ok(Some(lines))
}

pub fn format_duration(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}

pub fn lines_per_second(lines: u64, elapsed: Duration) -> f64 {
    lines as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
}
