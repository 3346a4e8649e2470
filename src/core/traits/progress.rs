/// Receives progress checkpoints from long-running batches.
///
/// Calls are synchronous and may arrive in bursts or repeat the same
/// value; implementations must tolerate both.
pub trait ProgressSink {
    fn set_progress(&self, message: Option<&str>, current: usize, total: usize);
}

/// Discards every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn set_progress(&self, _message: Option<&str>, _current: usize, _total: usize) {}
}

impl<F> ProgressSink for F
where
    F: Fn(Option<&str>, usize, usize),
{
    fn set_progress(&self, message: Option<&str>, current: usize, total: usize) {
        self(message, current, total)
    }
}
