//! Progress bar adapter for segment downloads

use hlsget_types::Progress;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal counter incremented once per downloaded segment.
///
/// The total segment count is only known once the manifest resolves
/// inside the engine, so this renders as a running counter rather
/// than a bounded bar.
#[derive(Clone)]
pub struct SegmentProgress {
    bar: ProgressBar,
}

impl SegmentProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::no_length();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} segments downloaded ({per_sec})")
                .unwrap(),
        );
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl Default for SegmentProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for SegmentProgress {
    fn increment(&self) {
        self.bar.inc(1);
    }
}
