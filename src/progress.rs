//! Block progress counters and indicatif bar helpers

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Callback invoked whenever `done_blocks` advances, with `(done, total)`
pub type ProgressCallback = Box<dyn FnMut(u64, u64)>;

/// Counters for one run of the snapshot builder.
///
/// Passed explicitly to the walker and the checksum engine; nothing here is
/// persisted. `done_blocks` only ever increases.
#[derive(Default)]
pub struct Progress {
    pub files_count: u64,
    pub dirs_count: u64,
    pub total_blocks: u64,
    pub total_bytes: u64,
    pub done_blocks: u64,
    on_advance: Option<ProgressCallback>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer that is notified after every advance
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.on_advance = Some(callback);
        self
    }

    /// Record one discovered file
    pub fn add_file(&mut self, byte_size: u64, size_blocks: u64) {
        self.files_count += 1;
        self.total_bytes += byte_size;
        self.total_blocks += size_blocks;
    }

    /// Record one discovered directory (the scan root is not counted)
    pub fn add_dir(&mut self) {
        self.dirs_count += 1;
    }

    /// Advance the done counter by `blocks`
    pub fn advance(&mut self, blocks: u64) {
        if blocks == 0 {
            return;
        }
        self.done_blocks += blocks;
        if let Some(callback) = self.on_advance.as_mut() {
            callback(self.done_blocks, self.total_blocks);
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("files_count", &self.files_count)
            .field("dirs_count", &self.dirs_count)
            .field("total_blocks", &self.total_blocks)
            .field("total_bytes", &self.total_bytes)
            .field("done_blocks", &self.done_blocks)
            .finish()
    }
}

/// Create a spinner for indeterminate progress (the tree scan)
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Create a progress bar over hashed blocks
pub fn create_progress_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {pos}/{len} blocks {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb
}

/// Build a progress callback that drives `pb`
pub fn bar_callback(pb: ProgressBar) -> ProgressCallback {
    Box::new(move |done, total| {
        if pb.length() != Some(total) {
            pb.set_length(total);
        }
        pb.set_position(done);
    })
}

/// Finish and clear progress bar
pub fn finish_and_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_add_file_accumulates_totals() {
        let mut progress = Progress::new();
        progress.add_file(10, 1);
        progress.add_file(0, 0);
        progress.add_dir();

        assert_eq!(progress.files_count, 2);
        assert_eq!(progress.dirs_count, 1);
        assert_eq!(progress.total_bytes, 10);
        assert_eq!(progress.total_blocks, 1);
        assert_eq!(progress.done_blocks, 0);
    }

    #[test]
    fn test_advance_notifies_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut progress = Progress::new()
            .with_callback(Box::new(move |done, total| sink.borrow_mut().push((done, total))));
        progress.total_blocks = 3;

        progress.advance(1);
        progress.advance(0);
        progress.advance(2);

        assert_eq!(progress.done_blocks, 3);
        assert_eq!(*seen.borrow(), vec![(1, 3), (3, 3)]);
    }
}
