//! Per-phase timing of scheduler ticks, written as a Chrome trace.
//!
//! Only recorded with `--features profiling`; otherwise every call below is
//! an inlined no-op and [`SpanGuard`] is a zero-sized type.
//!
//! [`CommandScheduler::run`](crate::CommandScheduler::run) opens one span per
//! tick and one per phase inside it (`subsystems.periodic`, `buttons.poll`,
//! `commands.execute`, `commands.queued`, `subsystems.default_commands`).
//! Callers may open their own spans around a tick:
//!
//! ```no_run
//! use command_framework::{profiler, CommandScheduler};
//!
//! profiler::init("target/profile/tick.json");
//! for _ in 0..500 {
//!     let _robot = profiler::span("robot_periodic");
//!     CommandScheduler::instance().run();
//! }
//! profiler::shutdown();
//! ```
//!
//! Recording state is thread-local, like the scheduler instance.

use std::borrow::Cow;
use std::path::Path;

#[cfg(feature = "profiling")]
mod recording {
    use std::borrow::Cow;
    use std::cell::RefCell;
    use std::fs::File;
    use std::io::{self, BufWriter, Write};
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    use log::{error, info};
    use serde_json::{json, Value};

    struct Trace {
        origin: Instant,
        path: PathBuf,
        events: Vec<Value>,
    }

    impl Trace {
        fn elapsed_us(&self) -> u64 {
            self.origin.elapsed().as_micros() as u64
        }

        fn write(&self) -> io::Result<()> {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let mut out = BufWriter::new(File::create(&self.path)?);
            serde_json::to_writer(&mut out, &json!({ "traceEvents": self.events }))?;
            out.flush()
        }
    }

    thread_local! {
        static TRACE: RefCell<Option<Trace>> = const { RefCell::new(None) };
    }

    pub fn init(path: &Path) {
        TRACE.with(|t| {
            *t.borrow_mut() = Some(Trace {
                origin: Instant::now(),
                path: path.to_path_buf(),
                events: Vec::new(),
            });
        });
    }

    pub fn shutdown() {
        let Some(trace) = TRACE.with(|t| t.borrow_mut().take()) else { return };
        match trace.write() {
            Ok(()) => info!("wrote {} trace events to {}", trace.events.len(), trace.path.display()),
            Err(e) => error!("could not write trace to {}: {e}", trace.path.display()),
        }
    }

    /// Open span: name and start time in microseconds.
    pub struct Open {
        name: Cow<'static, str>,
        start_us: u64,
    }

    pub fn open(name: Cow<'static, str>) -> Option<Open> {
        TRACE.with(|t| {
            t.borrow()
                .as_ref()
                .map(|trace| Open { name, start_us: trace.elapsed_us() })
        })
    }

    pub fn close(span: Open) {
        TRACE.with(|t| {
            if let Some(trace) = t.borrow_mut().as_mut() {
                let end_us = trace.elapsed_us();
                trace.events.push(json!({
                    "name": span.name,
                    "cat": "scheduler",
                    "ph": "X",
                    "ts": span.start_us,
                    "dur": end_us.saturating_sub(span.start_us),
                    "pid": 1,
                    "tid": 1,
                }));
            }
        });
    }
}

/// Starts recording on this thread. The trace is written to `path` by
/// [`shutdown`].
#[inline]
pub fn init<P: AsRef<Path>>(path: P) {
    #[cfg(feature = "profiling")]
    recording::init(path.as_ref());
    #[cfg(not(feature = "profiling"))]
    let _ = path;
}

/// Stops recording and writes the trace file. Failures are logged.
#[inline]
pub fn shutdown() {
    #[cfg(feature = "profiling")]
    recording::shutdown();
}

/// Opens a span that closes when the guard is dropped. Spans opened while
/// no recording is active are discarded.
#[inline]
pub fn span(name: impl Into<Cow<'static, str>>) -> SpanGuard {
    #[cfg(feature = "profiling")]
    {
        SpanGuard { open: recording::open(name.into()) }
    }
    #[cfg(not(feature = "profiling"))]
    {
        let _ = name;
        SpanGuard {}
    }
}

/// RAII guard returned by [`span`].
#[must_use = "the span closes as soon as the guard is dropped"]
pub struct SpanGuard {
    #[cfg(feature = "profiling")]
    open: Option<recording::Open>,
}

#[cfg(feature = "profiling")]
impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Some(open) = self.open.take() {
            recording::close(open);
        }
    }
}
