use tokio::sync::RwLock;

use crate::stats_logic::model::Record;

/// Append-only store of every record ingested this process lifetime.
///
/// Single-writer discipline: only the in-flight stream operation appends.
/// Readers take an index-bounded snapshot under the read lock, so a snapshot
/// never observes a partially appended record and stays valid while the
/// writer keeps appending. The store is never cleared or shrunk.
#[derive(Default)]
pub struct RecordStore {
    records: RwLock<Vec<Record>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: Record) {
        self.records.write().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Record count and the text of every record at the time of the call.
    pub async fn snapshot_texts(&self) -> (usize, Vec<String>) {
        let records = self.records.read().await;
        let texts = records.iter().map(|r| r.text.clone()).collect();
        (records.len(), texts)
    }
}
