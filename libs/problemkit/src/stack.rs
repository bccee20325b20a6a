//! Stack trace capture.

use std::fmt::{self, Write as _};

use crate::pool::Pool;

/// Captures a formatted stack trace.
///
/// `skip` is the number of additional caller frames to leave out after the
/// capturing machinery itself has been skipped.
pub trait StackCapturer: Send + Sync {
    fn capture_stack(&self, skip: usize) -> String;
}

impl<F> StackCapturer for F
where
    F: Fn(usize) -> String + Send + Sync,
{
    fn capture_stack(&self, skip: usize) -> String {
        self(skip)
    }
}

static BUFFERS: Pool<String> = Pool::new(String::new, String::clear);

/// Default capturer built on the `backtrace` crate.
///
/// Frames are rendered as `"<function>\n\t<file>:<line>"` and joined with
/// newlines. The leading run of frames belonging to the capture itself (this
/// crate, `backtrace`, and the `core`/`alloc`/`std` glue between them) is
/// dropped before `skip` is applied, so the first frame is the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCapturer;

impl StackCapturer for BacktraceCapturer {
    fn capture_stack(&self, skip: usize) -> String {
        let trace = backtrace::Backtrace::new();
        let mut buf = BUFFERS.checkout();

        let symbols: Vec<&backtrace::BacktraceSymbol> = trace
            .frames()
            .iter()
            .flat_map(backtrace::BacktraceFrame::symbols)
            .collect();
        let start = caller_start(
            symbols
                .iter()
                .map(|symbol| symbol.name().map(|name| format!("{name:#}"))),
        );

        for symbol in symbols.into_iter().skip(start + skip) {
            if !buf.is_empty() {
                buf.push('\n');
            }
            if write_frame(&mut buf, symbol).is_err() {
                break;
            }
        }

        tracing::trace!(skip, bytes = buf.len(), "captured problem stack trace");
        buf.as_str().to_owned()
    }
}

fn write_frame(out: &mut String, symbol: &backtrace::BacktraceSymbol) -> fmt::Result {
    match symbol.name() {
        Some(name) => write!(out, "{name:#}")?,
        None => out.push_str("<unknown>"),
    }
    out.push_str("\n\t");
    match symbol.filename() {
        Some(file) => write!(out, "{}", file.display())?,
        None => out.push_str("<unknown>"),
    }
    if let Some(line) = symbol.lineno() {
        write!(out, ":{line}")?;
    }
    Ok(())
}

/// Index of the first frame after the leading run of internal and glue
/// frames; 0 when the trace does not start inside this crate.
fn caller_start(names: impl IntoIterator<Item = Option<String>>) -> usize {
    let mut start = 0;
    for (index, name) in names.into_iter().enumerate() {
        match name.as_deref() {
            Some(name) if is_internal(name) => start = index + 1,
            Some(name) if !is_glue(name) => break,
            _ => {}
        }
    }
    start
}

fn is_glue(name: &str) -> bool {
    ["core::", "<core::", "alloc::", "<alloc::", "std::", "<std::"]
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn is_internal(name: &str) -> bool {
    name.starts_with("backtrace::")
        || name.starts_with("problemkit::")
        || name.starts_with("<problemkit::")
        || name.starts_with("<backtrace::")
}
