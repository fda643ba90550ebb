//! Background writes.
//!
//! The controller records settings on every transition; those writes go
//! through a dedicated thread so the event loop never waits on disk. Writes
//! are applied in submission order, so for one key the last write wins.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StoreError;

use super::Store;

enum WriteOp {
    Setting {
        key: String,
        value: serde_json::Value,
    },
    Duration {
        track_id: String,
        seconds: f64,
    },
    Flush(Sender<()>),
    Shutdown,
}

/// Fire-and-forget handle to the writer thread. Failed writes are logged,
/// not retried, and never rolled back in memory.
#[derive(Clone)]
pub struct StoreWriter {
    tx: Sender<WriteOp>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl StoreWriter {
    pub fn spawn(store: Store) -> Self {
        let (tx, rx) = mpsc::channel::<WriteOp>();
        let worker = thread::Builder::new()
            .name("store-writer".into())
            .spawn(move || run_writer(store, rx))
            .ok();
        if worker.is_none() {
            warn!("failed to spawn store writer thread; settings will not be saved");
        }
        Self {
            tx,
            worker: Arc::new(Mutex::new(worker)),
        }
    }

    pub fn save_setting<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.submit(WriteOp::Setting {
                key: key.to_string(),
                value,
            }),
            Err(e) => warn!(key, error = %e, "setting is not serializable"),
        }
    }

    pub fn update_duration(&self, track_id: &str, seconds: f64) {
        self.submit(WriteOp::Duration {
            track_id: track_id.to_string(),
            seconds,
        });
    }

    /// Block until everything submitted so far has been applied.
    pub fn flush(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        if self.tx.send(WriteOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    /// Apply pending writes and stop the thread.
    pub fn shutdown(&self) {
        let _ = self.tx.send(WriteOp::Shutdown);
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }

    fn submit(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            warn!(error = %StoreError::WriterClosed, "dropping write");
        }
    }
}

fn run_writer(store: Store, rx: Receiver<WriteOp>) {
    while let Ok(op) = rx.recv() {
        match op {
            WriteOp::Setting { key, value } => {
                if let Err(e) = store.save_setting(&key, &value) {
                    warn!(%key, error = %e, "failed to save setting");
                } else {
                    debug!(%key, %value, "saved setting");
                }
            }
            WriteOp::Duration { track_id, seconds } => {
                if let Err(e) = store.update_duration(&track_id, seconds) {
                    warn!(%track_id, error = %e, "failed to save corrected duration");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
            WriteOp::Shutdown => break,
        }
    }
}
