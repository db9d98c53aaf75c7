//! Port interfaces for metrics computation

use slotwatch_domain::types::SnapshotBatch;
use slotwatch_domain::Result;

/// Ordered feed of snapshot batches, one per source × iso week.
///
/// Adapters own discovery, decompression and parsing; the service only
/// requires that batches arrive in stream order and that rows within a
/// batch are chronological per location.
pub trait SnapshotSource {
    /// The next batch, or `None` when the stream is exhausted.
    fn next_batch(&mut self) -> Result<Option<SnapshotBatch>>;
}

/// Any iterator over already-materialized batches is a source; this is the
/// common shape for tests and in-memory callers.
impl<I> SnapshotSource for I
where
    I: Iterator<Item = SnapshotBatch>,
{
    fn next_batch(&mut self) -> Result<Option<SnapshotBatch>> {
        Ok(self.next())
    }
}
