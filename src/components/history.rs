// ============================================================================
// SNAPSHOT HISTORY - linear undo/redo timeline of rasterized images
// ============================================================================

use crate::snapshot::Snapshot;

/// One step in the timeline: the raster plus what produced it.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub snapshot: Snapshot,
    pub description: String,
}

impl HistoryEntry {
    pub fn memory_size(&self) -> usize {
        self.snapshot.width() as usize * self.snapshot.height() as usize * 4
    }
}

/// Append-only, truncate-on-write list of snapshots with a cursor.
///
/// `displayed()` is always `entries[cursor]`, or `None` while empty.
/// Pushing after an undo destroys the redo branch: the timeline never forks.
#[derive(Clone, Debug, Default)]
pub struct SnapshotHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate everything after the cursor, append, and move to the new tip.
    pub fn push(&mut self, snapshot: Snapshot, description: impl Into<String>) {
        if !self.entries.is_empty() && self.cursor + 1 < self.entries.len() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(HistoryEntry {
            snapshot,
            description: description.into(),
        });
        self.cursor = self.entries.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Step back one entry. Returns the description of the step undone.
    pub fn undo(&mut self) -> Option<String> {
        if !self.can_undo() {
            return None;
        }
        let undone = self.entries[self.cursor].description.clone();
        self.cursor -= 1;
        Some(undone)
    }

    /// Step forward one entry. Returns the description of the step redone.
    pub fn redo(&mut self) -> Option<String> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].description.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn displayed(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor).map(|e| &e.snapshot)
    }

    /// Cursor position, `None` while empty.
    pub fn position(&self) -> Option<usize> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            Some(self.entries[self.cursor].description.as_str())
        } else {
            None
        }
    }

    pub fn redo_description(&self) -> Option<&str> {
        if self.can_redo() {
            Some(self.entries[self.cursor + 1].description.as_str())
        } else {
            None
        }
    }

    /// All step descriptions, oldest first.
    pub fn descriptions(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.description.clone()).collect()
    }

    /// Approximate pixel memory held by the timeline.
    pub fn memory_usage(&self) -> usize {
        self.entries.iter().map(|e| e.memory_size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::SnapshotHistory;
    use crate::snapshot::Snapshot;
    use image::{Rgba, RgbaImage};

    fn snap(v: u8) -> Snapshot {
        Snapshot::new(RgbaImage::from_pixel(2, 2, Rgba([v, v, v, 255])))
    }

    #[test]
    fn empty_history_undo_redo_are_noops() {
        let mut history = SnapshotHistory::new();
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
        assert!(history.displayed().is_none());
        assert_eq!(history.position(), None);
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn undo_redo_flow() {
        let mut history = SnapshotHistory::new();
        let a = snap(1);
        let b = snap(2);
        let c = snap(3);
        history.push(a.clone(), "Open");
        history.push(b.clone(), "Ratio");
        history.push(c.clone(), "Text");

        assert_eq!(history.undo().as_deref(), Some("Text"));
        assert_eq!(history.displayed(), Some(&b));
        assert_eq!(history.undo().as_deref(), Some("Ratio"));
        assert_eq!(history.displayed(), Some(&a));
        assert_eq!(history.undo(), None);
        assert_eq!(history.position(), Some(0));

        assert_eq!(history.redo().as_deref(), Some("Ratio"));
        assert_eq!(history.redo().as_deref(), Some("Text"));
        assert_eq!(history.redo(), None);
        assert_eq!(history.displayed(), Some(&c));
    }

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let n = 6;
        let k = 3;
        let mut history = SnapshotHistory::new();
        for i in 0..n {
            history.push(snap(i as u8), format!("step {}", i));
        }
        for _ in 0..k {
            history.undo();
        }
        let fresh = snap(200);
        history.push(fresh.clone(), "branch");

        assert_eq!(history.len(), n - k + 1);
        assert_eq!(history.position(), Some(n - k));
        assert_eq!(history.displayed(), Some(&fresh));
        assert!(!history.can_redo());
    }

    #[test]
    fn descriptions_and_memory() {
        let mut history = SnapshotHistory::new();
        history.push(snap(1), "Open");
        history.push(snap(2), "Merge");
        assert_eq!(history.undo_description(), Some("Merge"));
        assert_eq!(history.redo_description(), None);
        history.undo();
        assert_eq!(history.redo_description(), Some("Merge"));
        assert_eq!(history.descriptions(), vec!["Open", "Merge"]);
        assert_eq!(history.memory_usage(), 2 * 2 * 2 * 4);
    }
}
