/// Aggregated view of session progress, useful for status lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub scope: String,
    pub scope_len: usize,
    pub cur_step: u64,
    pub asked: u32,
    pub correct: u32,
    /// The most recent answer was followed by a successful autosave.
    pub autosaved: bool,
    pub is_finished: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.asked - self.correct
    }
}
