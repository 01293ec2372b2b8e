//! Aggregates download/initialization sub-tasks into one progress view.
//!
//! Operations never fail: updating or finishing an unknown task implicitly
//! creates it first. Finished tasks leave the live snapshot immediately.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTask {
    /// Stable key, usually the file name
    pub id: String,
    pub loaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub done: bool,
}

impl ProgressTask {
    fn new(id: &str, total_bytes: Option<u64>) -> Self {
        Self { id: id.to_string(), loaded_bytes: 0, total_bytes, done: false }
    }

    /// Fraction in `0.0..=1.0`, or `None` when the total is unknown (render a spinner)
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(if self.done { 1.0 } else { 0.0 }),
            Some(total) => Some((self.loaded_bytes as f64 / total as f64).clamp(0.0, 1.0)),
            None => None,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.fraction().is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    /// Live tasks in insertion order
    tasks: Vec<ProgressTask>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, task_id: &str, total_bytes: Option<u64>) -> &mut ProgressTask {
        let idx = match self.tasks.iter().position(|t| t.id == task_id) {
            Some(idx) => idx,
            None => {
                self.tasks.push(ProgressTask::new(task_id, total_bytes));
                self.tasks.len() - 1
            }
        };
        &mut self.tasks[idx]
    }

    /// Register a task. Re-initializing a live task resets its counters.
    pub fn init(&mut self, task_id: &str, total_bytes: Option<u64>) {
        let task = self.entry(task_id, total_bytes);
        task.loaded_bytes = 0;
        task.total_bytes = total_bytes;
        task.done = false;
    }

    /// A `None` total keeps whatever total is already known.
    pub fn update(&mut self, task_id: &str, loaded_bytes: u64, total_bytes: Option<u64>) {
        let task = self.entry(task_id, total_bytes);
        task.loaded_bytes = loaded_bytes;
        if total_bytes.is_some() {
            task.total_bytes = total_bytes;
        }
    }

    /// Remove the task from the live snapshot
    pub fn done(&mut self, task_id: &str) {
        self.entry(task_id, None).done = true;
        self.tasks.retain(|t| !t.done);
    }

    pub fn snapshot(&self) -> Vec<ProgressTask> {
        self.tasks.clone()
    }

    pub fn tasks(&self) -> &[ProgressTask] {
        &self.tasks
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == task_id)
    }

    /// No live task remains
    pub fn is_settled(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Byte-weighted fraction over tasks with a known total
    pub fn overall_fraction(&self) -> Option<f64> {
        let (loaded, total) = self
            .tasks
            .iter()
            .filter_map(|t| t.total_bytes.map(|total| (t.loaded_bytes.min(total), total)))
            .fold((0u64, 0u64), |(l, t), (tl, tt)| (l.saturating_add(tl), t.saturating_add(tt)));
        if total == 0 { None } else { Some(loaded as f64 / total as f64) }
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_removes_task() {
        let mut agg = ProgressAggregator::new();
        agg.init("weights", Some(100));
        agg.update("weights", 50, Some(100));
        assert_eq!(agg.tasks()[0].fraction(), Some(0.5));
        agg.done("weights");
        assert!(!agg.contains("weights"));
        assert!(agg.is_settled());
    }

    #[test]
    fn unknown_ids_are_created_on_demand() {
        let mut agg = ProgressAggregator::new();
        agg.update("tokenizer.json", 10, None);
        assert!(agg.contains("tokenizer.json"));
        assert!(agg.tasks()[0].is_indeterminate());

        // done on a never-seen id must not leave a residual row
        agg.done("config.json");
        assert!(!agg.contains("config.json"));
        assert_eq!(agg.snapshot().len(), 1);
    }

    #[test]
    fn interleaved_tasks_keep_insertion_order() {
        let mut agg = ProgressAggregator::new();
        agg.init("a", Some(10));
        agg.init("b", None);
        agg.update("b", 3, Some(6));
        agg.update("a", 5, None);
        agg.init("c", Some(1));
        let ids: Vec<_> = agg.snapshot().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(agg.tasks()[0].total_bytes, Some(10));
        assert_eq!(agg.tasks()[1].fraction(), Some(0.5));
    }

    #[test]
    fn snapshot_never_contains_finished_ids() {
        let mut agg = ProgressAggregator::new();
        let ops: &[(&str, u8)] = &[("x", 0), ("y", 0), ("x", 1), ("x", 2), ("y", 1), ("x", 1), ("y", 2), ("x", 2)];
        let mut finished = std::collections::HashSet::new();
        for (id, op) in ops {
            match op {
                0 => {
                    agg.init(id, Some(100));
                    finished.remove(id);
                }
                1 => {
                    agg.update(id, 40, Some(100));
                    finished.remove(id);
                }
                _ => {
                    agg.done(id);
                    finished.insert(*id);
                }
            }
            for id in &finished {
                assert!(!agg.contains(id));
            }
        }
        assert!(agg.is_settled());
    }

    #[test]
    fn overall_fraction_ignores_unknown_totals() {
        let mut agg = ProgressAggregator::new();
        assert_eq!(agg.overall_fraction(), None);
        agg.update("a", 25, Some(100));
        agg.update("b", 75, Some(100));
        agg.update("c", 999, None);
        assert_eq!(agg.overall_fraction(), Some(0.5));
    }

    #[test]
    fn zero_total_is_not_a_division() {
        let mut agg = ProgressAggregator::new();
        agg.init("empty.bin", Some(0));
        assert_eq!(agg.tasks()[0].fraction(), Some(0.0));
    }
}
