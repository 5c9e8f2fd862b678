use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::{Frame, GetOutcome, InputMode, Required};
use crate::runtime::variant::Variant;

/// A typed consumer endpoint (spec §3/§4.1).
///
/// Each `InputPort` owns exactly one internal queue; the corresponding
/// `mpsc::Sender` half is handed out to every [`OutputPort`](super::OutputPort)
/// that connects to it (one clone per incoming wire), so `rc` below is
/// exactly "the number of upstream producers still live" — it is
/// incremented once per [`Graph`](crate::runtime::Graph) construction-time
/// wire and decremented once per EOS frame observed.
#[derive(Debug)]
pub struct InputPort {
    pub id: String,
    pub type_hint: Option<String>,
    pub mode: InputMode,
    pub required: Required,
    default_value: Option<Variant>,
    sticky_last: Mutex<Option<Arc<Variant>>>,
    rc: AtomicUsize,
    tx: mpsc::Sender<Frame>,
    rx: Mutex<mpsc::Receiver<Frame>>,
}

impl InputPort {
    pub fn new(
        id: impl Into<String>,
        type_hint: Option<String>,
        mode: InputMode,
        required: Required,
        default_value: Option<Variant>,
        queue_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        InputPort {
            id: id.into(),
            type_hint,
            mode,
            required,
            default_value,
            sticky_last: Mutex::new(None),
            rc: AtomicUsize::new(0),
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// A clonable sender handed to an [`OutputPort`](super::OutputPort) at
    /// wiring time. Each call represents one new incoming wire; the caller
    /// is responsible for calling [`InputPort::inc_ref_count`] to match.
    pub fn sender(&self) -> mpsc::Sender<Frame> {
        self.tx.clone()
    }

    pub fn inc_ref_count(&self) {
        self.rc.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether this pin was configured with a default `value` (spec §4.4
    /// "Validate": a `REQUIRED` pin satisfies validation via a connection or
    /// a configured default). STATIC pins always have one; STICKY pins may.
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    fn dec_ref_count(&self) -> usize {
        // `rc` only ever moves downward after construction (no rewiring at
        // runtime), so a saturating decrement protects against the
        // zero-producers boundary case without ever under/overflowing.
        loop {
            let cur = self.rc.load(Ordering::SeqCst);
            if cur == 0 {
                return 0;
            }
            if self.rc.compare_exchange(cur, cur - 1, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                return cur - 1;
            }
        }
    }

    pub fn ref_count(&self) -> usize {
        self.rc.load(Ordering::SeqCst)
    }

    pub fn empty(&self) -> bool {
        self.rx.try_lock().map(|rx| rx.is_empty()).unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.rx.try_lock().map(|rx| rx.len()).unwrap_or(0)
    }

    /// `get()` for a `QUEUE` or `REQUIRED_IF_CONNECTED`-but-bound pin:
    /// blocks until an item is available, translating a drained upstream
    /// into [`GetOutcome::Eos`] (spec §4.1 "EOS handling").
    ///
    /// Deliberately does *not* race against a stop/cancellation token: the
    /// spec requires `stop()` to be observed only at loop-iteration
    /// boundaries, never to interrupt an in-flight blocking `get()` (§5).
    /// Only the optional forceful `terminate()` path
    /// ([`InputPort::force_eos`]) unblocks a pending call.
    pub async fn get(&self) -> GetOutcome {
        if self.mode == InputMode::Static {
            return GetOutcome::Value(Arc::new(self.default_value.clone().unwrap_or(Variant::Null)));
        }
        loop {
            let mut rx = self.rx.lock().await;
            match rx.recv().await {
                Some(Frame::Item(v)) => return GetOutcome::Value(v),
                Some(Frame::Eos) => {
                    drop(rx);
                    if self.dec_ref_count() > 0 {
                        continue;
                    }
                    return GetOutcome::Eos;
                }
                None => return GetOutcome::Eos,
            }
        }
    }

    /// Non-blocking sample used for STICKY/STATIC pins (spec §4.3 step 3).
    /// Never blocks once a STICKY input is primed; may block exactly once,
    /// on the very first sample, if no default was configured and nothing
    /// has arrived yet. Only ever called on STICKY/STATIC ports.
    pub async fn sample(&self) -> Arc<Variant> {
        debug_assert!(matches!(self.mode, InputMode::Sticky | InputMode::Static));
        match self.mode {
            InputMode::Static => Arc::new(self.default_value.clone().unwrap_or(Variant::Null)),
            InputMode::Sticky => self.sample_sticky().await,
            InputMode::Queue => Arc::new(self.default_value.clone().unwrap_or(Variant::Null)),
        }
    }

    /// Non-blocking peek for a bound but non-REQUIRED QUEUE pin (an
    /// OPTIONAL pin, or a REQUIRED_IF_CONNECTED pin sampled outside its
    /// pull set). Returns `None` when nothing is currently buffered, rather
    /// than blocking — an optional input the producer hasn't written to yet
    /// must not stall the component.
    pub fn try_get(&self) -> Option<GetOutcome> {
        let mut rx = self.rx.try_lock().ok()?;
        loop {
            match rx.try_recv() {
                Ok(Frame::Item(v)) => return Some(GetOutcome::Value(v)),
                Ok(Frame::Eos) => {
                    drop(rx);
                    let outcome = if self.dec_ref_count() == 0 { Some(GetOutcome::Eos) } else { None };
                    if outcome.is_some() {
                        return outcome;
                    }
                    rx = self.rx.try_lock().ok()?;
                }
                Err(_) => return None,
            }
        }
    }

    async fn sample_sticky(&self) -> Arc<Variant> {
        let mut latch = self.sticky_last.lock().await;
        // Drain whatever is currently buffered without blocking, keeping
        // only the newest item (STICKY never merges, it latches).
        loop {
            let mut rx = self.rx.lock().await;
            match rx.try_recv() {
                Ok(Frame::Item(v)) => {
                    drop(rx);
                    *latch = Some(v);
                }
                Ok(Frame::Eos) => {
                    drop(rx);
                    self.dec_ref_count();
                }
                Err(_) => break,
            }
        }
        if let Some(v) = latch.as_ref() {
            return v.clone();
        }
        if let Some(default) = &self.default_value {
            let v = Arc::new(default.clone());
            *latch = Some(v.clone());
            return v;
        }
        // No default and nothing has arrived yet: block for the first item,
        // exactly once (spec §3 "blocks only on the first call before any
        // item has arrived *and* if no default was configured").
        drop(latch);
        loop {
            let mut rx = self.rx.lock().await;
            match rx.recv().await {
                Some(Frame::Item(v)) => {
                    drop(rx);
                    let mut latch = self.sticky_last.lock().await;
                    *latch = Some(v.clone());
                    return v;
                }
                Some(Frame::Eos) => {
                    drop(rx);
                    if self.dec_ref_count() == 0 {
                        // Upstream is gone and never sent anything: there is
                        // no value to latch onto. Null is the least
                        // surprising terminal value here.
                        let v = Arc::new(Variant::Null);
                        let mut latch = self.sticky_last.lock().await;
                        *latch = Some(v.clone());
                        return v;
                    }
                }
                None => return Arc::new(Variant::Null),
            }
        }
    }

    /// Forceful unblock used by an optional `terminate()` escape hatch
    /// (spec §4.4 "Terminate"): best-effort, non-blocking EOS injection.
    pub fn force_eos(&self) {
        let _ = self.tx.try_send(Frame::Eos);
    }
}
