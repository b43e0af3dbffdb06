//! Batch Transformer - Count and time windows
//!
//! Three modes:
//!
//! - **count**: every call appends; the call that reaches `batch_threshold`
//!   flushes the window and continues, all others stop.
//! - **time**: the first call of an idle window blocks for `time_interval`,
//!   then flushes everything appended meanwhile. Other callers append and
//!   stop immediately.
//! - **time and count**: like time, but an appender that reaches the
//!   threshold wakes the blocked first caller early.
//!
//! Each appended item is flushed exactly once. [`Transformer::close`] wakes
//! a blocked caller so it flushes what it has. A blocked caller that is
//! cancelled releases the window with its items still buffered; the next
//! caller opens a new window over them.
//!
//! ```toml
//! [functions.window]
//! type = "batch_by_time_and_count"
//! batch_threshold = 30
//! time_interval = "60s"
//! merge_on_send = true
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use edgeflow_config::FunctionConfig;
use edgeflow_protocol::{Payload, coerce};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::registry::FunctionFactory;
use crate::{
    FunctionContext, Outcome, TransformError, TransformFuture, TransformResult, Transformer,
    require_input,
};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Window mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    CountOnly,
    TimeOnly,
    TimeAndCount,
}

impl BatchMode {
    pub fn function_name(self) -> &'static str {
        match self {
            Self::CountOnly => "batch_by_count",
            Self::TimeOnly => "batch_by_time",
            Self::TimeAndCount => "batch_by_time_and_count",
        }
    }

    fn uses_count(self) -> bool {
        matches!(self, Self::CountOnly | Self::TimeAndCount)
    }

    fn uses_timer(self) -> bool {
        matches!(self, Self::TimeOnly | Self::TimeAndCount)
    }
}

#[derive(Default)]
struct Window {
    buffer: Vec<Bytes>,
    timer_active: bool,
    done: Option<oneshot::Sender<()>>,
}

/// What a caller does after appending
enum Step {
    Stop,
    Flush(Vec<Bytes>),
    Wait(oneshot::Receiver<()>),
}

/// Held by the caller blocked on an open time window
///
/// Dropping it without [`WindowLease::release`] (the caller was cancelled)
/// clears the timer so later callers are not left appending to a window
/// nobody will flush.
struct WindowLease<'a> {
    window: &'a Mutex<Window>,
    released: bool,
}

impl<'a> WindowLease<'a> {
    fn new(window: &'a Mutex<Window>) -> Self {
        Self {
            window,
            released: false,
        }
    }

    /// Close the window and take everything appended to it
    fn release(mut self) -> Vec<Bytes> {
        self.released = true;
        let mut window = self.window.lock();
        window.timer_active = false;
        window.done = None;
        std::mem::take(&mut window.buffer)
    }
}

impl Drop for WindowLease<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut window = self.window.lock();
        window.timer_active = false;
        window.done = None;
        tracing::debug!(
            pending = window.buffer.len(),
            "batch waiter cancelled, window released"
        );
    }
}

/// Windowing transformer shared by every pipeline that lists it
pub struct BatchTransformer {
    mode: BatchMode,
    threshold: usize,
    interval: Duration,
    merge_on_send: bool,
    window: Mutex<Window>,
    shutdown: CancellationToken,
}

impl BatchTransformer {
    /// Count window flushing every `threshold` items
    pub fn by_count(threshold: usize) -> Self {
        Self::new(BatchMode::CountOnly, threshold, Duration::ZERO)
    }

    /// Time window of `interval`
    pub fn by_time(interval: Duration) -> Self {
        Self::new(BatchMode::TimeOnly, 0, interval)
    }

    /// Time window of `interval`, cut short at `threshold` items
    pub fn by_time_and_count(interval: Duration, threshold: usize) -> Self {
        Self::new(BatchMode::TimeAndCount, threshold, interval)
    }

    fn new(mode: BatchMode, threshold: usize, interval: Duration) -> Self {
        Self {
            mode,
            threshold,
            interval,
            merge_on_send: false,
            window: Mutex::new(Window::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Emit flushed windows as one JSON array instead of a sequence
    pub fn with_merge_on_send(mut self, merge: bool) -> Self {
        self.merge_on_send = merge;
        self
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Items appended but not yet flushed
    pub fn pending(&self) -> usize {
        self.window.lock().buffer.len()
    }

    fn enqueue(&self, data: Bytes) -> Step {
        let mut window = self.window.lock();
        window.buffer.push(data);
        let reached = self.mode.uses_count() && window.buffer.len() >= self.threshold;

        if !self.mode.uses_timer() {
            return if reached {
                Step::Flush(std::mem::take(&mut window.buffer))
            } else {
                Step::Stop
            };
        }

        if window.timer_active {
            if reached && let Some(done) = window.done.take() {
                let _ = done.send(());
            }
            return Step::Stop;
        }

        if reached {
            return Step::Flush(std::mem::take(&mut window.buffer));
        }

        let (tx, rx) = oneshot::channel();
        window.timer_active = true;
        window.done = Some(tx);
        Step::Wait(rx)
    }


    fn emit(&self, items: Vec<Bytes>) -> Outcome {
        if items.is_empty() {
            return Outcome::Stop;
        }
        tracing::debug!(function = self.name(), items = items.len(), "batch flushed");

        if !self.merge_on_send {
            return Outcome::next(Payload::Sequence(items));
        }

        let len = items.iter().map(|b| b.len() + 1).sum::<usize>() + 1;
        let mut merged = BytesMut::with_capacity(len);
        merged.put_u8(b'[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                merged.put_u8(b',');
            }
            merged.put_slice(item);
        }
        merged.put_u8(b']');
        Outcome::next(merged.freeze())
    }
}

impl Transformer for BatchTransformer {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let input = require_input(self.name(), ctx, input)?;
            let data = coerce(&input)?;

            match self.enqueue(data) {
                Step::Stop => Ok(Outcome::Stop),
                Step::Flush(items) => Ok(self.emit(items)),
                Step::Wait(done) => {
                    let lease = WindowLease::new(&self.window);
                    tokio::select! {
                        _ = tokio::time::sleep(self.interval) => {}
                        _ = done => {
                            tracing::trace!(function = self.name(), "batch threshold reached");
                        }
                        _ = self.shutdown.cancelled() => {}
                    }
                    Ok(self.emit(lease.release()))
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        self.mode.function_name()
    }

    fn close(&self) -> TransformResult<()> {
        self.shutdown.cancel();
        Ok(())
    }
}

/// Factory for one batch mode
pub struct BatchFactory {
    mode: BatchMode,
}

impl BatchFactory {
    pub fn new(mode: BatchMode) -> Self {
        Self { mode }
    }
}

impl FunctionFactory for BatchFactory {
    fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        let name = self.mode.function_name();

        let threshold = if self.mode.uses_count() {
            match config.get_int("batch_threshold") {
                Some(n) if n > 0 => n as usize,
                _ => {
                    return Err(TransformError::config(format!(
                        "{name}: 'batch_threshold' must be a positive integer"
                    )));
                }
            }
        } else {
            0
        };

        let interval = if self.mode.uses_timer() {
            match config.get_duration("time_interval") {
                Ok(Some(d)) if !d.is_zero() => d,
                Ok(_) => {
                    return Err(TransformError::config(format!(
                        "{name}: 'time_interval' must be a positive duration"
                    )));
                }
                Err(e) => return Err(TransformError::config(format!("{name}: {e}"))),
            }
        } else {
            Duration::ZERO
        };

        let merge = config.get_bool("merge_on_send").unwrap_or(false);
        Ok(Arc::new(
            BatchTransformer::new(self.mode, threshold, interval).with_merge_on_send(merge),
        ))
    }

    fn name(&self) -> &'static str {
        self.mode.function_name()
    }
}
