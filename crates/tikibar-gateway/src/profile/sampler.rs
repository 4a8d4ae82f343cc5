//! Low-overhead frame sampler.
//!
//! Instead of walking machine stacks, the sampler counts the request's
//! *instrumented* frame stack: code pushes named frames (view, template,
//! query) with [`FrameStack::enter`], and a background ticker records the
//! current stack every `interval`. The result is a flame-graph friendly list
//! of `"a;b;c count"` entries. Best-effort: frames entered and left between
//! two ticks are never seen.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tikibar_core::{Result, TikibarError};

/// Named frames currently entered by a request.
///
/// Concurrent futures of one request share the stack, so frames need not be
/// left in the order they were entered; each guard removes its own frame.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Arc<Mutex<Vec<(u64, String)>>>,
    next_id: Arc<AtomicU64>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `name`; the frame is removed when the guard drops.
    pub fn enter(&self, name: impl Into<String>) -> FrameGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut f) = self.frames.lock() {
            f.push((id, name.into()));
        }
        FrameGuard { stack: self.clone(), id }
    }

    /// Current stack, outermost first, joined by `;`.
    pub fn snapshot(&self) -> String {
        self.frames
            .lock()
            .map(|f| f.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>().join(";"))
            .unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or_default()
    }

    fn leave(&self, id: u64) {
        if let Ok(mut f) = self.frames.lock() {
            if let Some(pos) = f.iter().rposition(|(frame_id, _)| *frame_id == id) {
                f.remove(pos);
            }
        }
    }
}

#[must_use = "the frame is left as soon as the guard is dropped"]
pub struct FrameGuard {
    stack: FrameStack,
    id: u64,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.stack.leave(self.id);
    }
}

type Counts = Arc<Mutex<HashMap<String, u64>>>;

pub struct Sampler {
    interval: Duration,
    started: Option<Instant>,
    counts: Counts,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            started: None,
            counts: Arc::default(),
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start sampling `frames` on a background thread.
    pub fn start(&mut self, frames: FrameStack) -> Result<()> {
        if self.handle.is_some() {
            return Err(TikibarError::Internal("sampler already running".into()));
        }
        self.started = Some(Instant::now());
        // A fresh flag per run: a ticker detached by an earlier `stop` keeps
        // seeing its own flag set.
        self.stop = Arc::new(AtomicBool::new(false));

        let interval = self.interval;
        let counts = Arc::clone(&self.counts);
        let stop = Arc::clone(&self.stop);
        let handle = std::thread::Builder::new()
            .name("tikibar-sampler".into())
            .spawn(move || loop {
                std::thread::park_timeout(interval);
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                let stack = frames.snapshot();
                if stack.is_empty() {
                    continue;
                }
                if let Ok(mut c) = counts.lock() {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    *c.entry(stack).or_insert(0) += 1;
                }
            })
            .map_err(|e| TikibarError::Internal(format!("sampler spawn failed: {e}")))?;

        self.handle = Some(handle);
        Ok(())
    }

    /// `"stack count"` entries, most frequent first, joined by `,`. Empty if
    /// the sampler never started.
    pub fn output_stats(&self) -> String {
        if self.started.is_none() {
            return String::new();
        }
        let Ok(counts) = self.counts.lock() else {
            return String::new();
        };
        let mut ordered: Vec<(&String, &u64)> = counts.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        ordered
            .iter()
            .map(|(stack, n)| format!("\"{stack} {n}\""))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn sample_count(&self) -> u64 {
        self.counts
            .lock()
            .map(|c| c.values().sum())
            .unwrap_or_default()
    }

    /// Drop collected counts and restart the clock.
    pub fn reset(&mut self) {
        self.started = Some(Instant::now());
        if let Ok(mut c) = self.counts.lock() {
            c.clear();
        }
    }

    /// Stop the ticker without waiting for its thread to exit. Collected
    /// counts are kept and no sample is added after this returns.
    pub fn stop(&mut self) {
        {
            // Ticks count under this lock and re-check the flag there.
            let _counts = self.counts.lock();
            self.stop.store(true, Ordering::Relaxed);
        }
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}
