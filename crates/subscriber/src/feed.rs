use tickercast_protocol::MarketSnapshot;
use tokio::sync::watch;

/// Write half of the latest-snapshot slot. A publish replaces whatever the
/// consumer has not read yet.
#[derive(Debug)]
pub struct SnapshotSlot {
    tx: watch::Sender<Option<MarketSnapshot>>,
}

/// Read half of the latest-snapshot slot.
#[derive(Debug, Clone)]
pub struct SnapshotFeed {
    rx: watch::Receiver<Option<MarketSnapshot>>,
}

/// A depth-1 slot: the consumer only ever sees the newest snapshot.
pub fn latest_slot() -> (SnapshotSlot, SnapshotFeed) {
    let (tx, rx) = watch::channel(None);
    (SnapshotSlot { tx }, SnapshotFeed { rx })
}

impl SnapshotSlot {
    pub fn publish(&self, snapshot: MarketSnapshot) {
        // send_replace never fails, even with no feed left
        self.tx.send_replace(Some(snapshot));
    }

    pub fn feed(&self) -> SnapshotFeed {
        SnapshotFeed {
            rx: self.tx.subscribe(),
        }
    }
}

impl SnapshotFeed {
    /// Wait for a snapshot newer than the last one returned. `None` once the
    /// slot is dropped with nothing unread.
    pub async fn next(&mut self) -> Option<MarketSnapshot> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }

    /// The newest snapshot, without waiting
    pub fn latest(&self) -> Option<MarketSnapshot> {
        self.rx.borrow().clone()
    }
}
