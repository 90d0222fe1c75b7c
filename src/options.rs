/// Knobs for display-set assembly and batch decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail a display set on out-of-order object parts instead of letting
    /// the latest part win.
    pub strict_sequencing: bool,
    /// Worker threads for [`crate::decode_all_display_sets_parallel`].
    pub workers: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            strict_sequencing: false,
            workers: num_cpus::get(),
        }
    }
}

impl DecodeOptions {
    pub fn strict_sequencing(mut self, strict: bool) -> Self {
        self.strict_sequencing = strict;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
