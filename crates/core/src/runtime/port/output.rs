use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::{Frame, OutputMode};
use crate::runtime::variant::Variant;

/// A typed producer endpoint (spec §3/§4.2).
#[derive(Debug)]
pub struct OutputPort {
    pub id: String,
    pub type_hint: Option<String>,
    pub mode: OutputMode,
    consumers: Mutex<Vec<mpsc::Sender<Frame>>>,
    cursor: AtomicUsize,
    closed: AtomicBool,
}

impl OutputPort {
    pub fn new(id: impl Into<String>, type_hint: Option<String>, mode: OutputMode) -> Self {
        OutputPort {
            id: id.into(),
            type_hint,
            mode,
            consumers: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Binds a new consumer queue. Must be called before [`OutputPort::send`]
    /// delivers to it (spec §4.2).
    pub async fn connect(&self, consumer: mpsc::Sender<Frame>) {
        self.consumers.lock().await.push(consumer);
    }

    pub async fn consumer_count(&self) -> usize {
        self.consumers.lock().await.len()
    }

    /// Dispatches `v` per `mode` (spec §3 output port invariants). A `send`
    /// with zero bound consumers is a silent no-op (spec §4.2); a `send`
    /// after [`OutputPort::close`] is a `DeliveryError` — logged and
    /// dropped, never propagated.
    pub async fn send(&self, v: Variant) -> crate::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            log::warn!("send() on closed output port '{}': dropped", self.id);
            return Ok(());
        }
        let consumers = self.consumers.lock().await;
        if consumers.is_empty() {
            return Ok(());
        }
        match self.mode {
            OutputMode::Ref => {
                let item = Arc::new(v);
                for tx in consumers.iter() {
                    self.deliver(tx, Frame::Item(item.clone())).await;
                }
            }
            OutputMode::Value => {
                for tx in consumers.iter() {
                    self.deliver(tx, Frame::Item(Arc::new(v.clone()))).await;
                }
            }
            OutputMode::Circle => {
                let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % consumers.len();
                self.deliver(&consumers[idx], Frame::Item(Arc::new(v))).await;
            }
        }
        Ok(())
    }

    /// Sends a pre-built `Arc<Variant>` to every consumer with REF fan-out,
    /// preserving object identity across the splice. Used internally by
    /// [`GraphPort`](crate::runtime::graph_port) relays, where the value has
    /// already travelled through one hop and must not be re-copied.
    pub async fn send_shared(&self, v: Arc<Variant>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let consumers = self.consumers.lock().await;
        for tx in consumers.iter() {
            self.deliver(tx, Frame::Item(v.clone())).await;
        }
    }

    async fn deliver(&self, tx: &mpsc::Sender<Frame>, frame: Frame) {
        if tx.send(frame).await.is_err() {
            log::warn!("consumer of output port '{}' dropped its receiver", self.id);
        }
    }

    /// Emits EOS on every consumer exactly once (spec §4.2 "On owner
    /// shutdown..."). Idempotent: a second call is a no-op (spec §8
    /// "finish() called twice emits EOS only on the first").
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let consumers = self.consumers.lock().await;
        for tx in consumers.iter() {
            let _ = tx.send(Frame::Eos).await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
