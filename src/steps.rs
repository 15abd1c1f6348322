//! Derived per-step status board.
//!
//! The backend reports a flat `current_step` string; the board turns that
//! into the four presentation statuses the UI contract needs, enforcing the
//! step invariants: while a job runs exactly one step is active, everything
//! before it is completed, everything after it is waiting, and progression
//! is strictly forward.

use crate::model::{Step, StepStatus};

/// Transitions produced by applying one backend observation, in emission
/// order (completions of passed steps first, then the new active step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTransition {
    Completed(Step),
    Started(Step),
}

#[derive(Debug, Clone)]
pub struct StepBoard {
    statuses: [StepStatus; 4],
}

impl Default for StepBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StepBoard {
    /// Fresh board, all steps waiting. Each job gets its own board so no
    /// state leaks between successive runs.
    pub fn new() -> Self {
        Self {
            statuses: [StepStatus::Waiting; 4],
        }
    }

    fn active(&self) -> Option<Step> {
        Step::ALL
            .into_iter()
            .find(|step| self.statuses[step.index()] == StepStatus::Active)
    }

    /// Mark `step` as the active one, completing everything before it.
    ///
    /// Forward-only: observing the already-active step is a no-op, and a
    /// backend report that would move backwards is ignored.
    pub fn advance(&mut self, step: Step) -> Vec<StepTransition> {
        let mut transitions = Vec::new();
        let from = match self.active() {
            Some(active) if step.index() <= active.index() => return transitions,
            Some(active) => active.index(),
            // First observation: anything the backend skipped over counts
            // as already done.
            None => 0,
        };
        for passed in &Step::ALL[from..step.index()] {
            self.statuses[passed.index()] = StepStatus::Completed;
            transitions.push(StepTransition::Completed(*passed));
        }
        self.statuses[step.index()] = StepStatus::Active;
        transitions.push(StepTransition::Started(step));
        transitions
    }

    /// Terminal success: the active step (if any) becomes completed.
    pub fn finish(&mut self) -> Option<Step> {
        let step = self.active()?;
        self.statuses[step.index()] = StepStatus::Completed;
        Some(step)
    }

    /// Terminal failure: the active step (or the first step, when the job
    /// never got going) becomes an error.
    pub fn fail(&mut self) -> Step {
        let step = self.active().unwrap_or(Step::DataLoading);
        self.statuses[step.index()] = StepStatus::Error;
        step
    }

    /// Resolve which step a log line belongs to: the classifier's hint if it
    /// had one, otherwise the active step, otherwise the first step (for
    /// lines arriving before any step started).
    pub fn attribute_log(&self, hint: Option<Step>) -> Step {
        hint.or_else(|| self.active()).unwrap_or(Step::DataLoading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(board: &StepBoard) {
        // At most one active step; completed steps form a prefix before it,
        // waiting steps the suffix after it.
        let active_count = board
            .statuses
            .iter()
            .filter(|s| **s == StepStatus::Active)
            .count();
        assert!(active_count <= 1, "more than one active step");
        if let Some(step) = board.active() {
            for before in &Step::ALL[..step.index()] {
                assert_eq!(board.statuses[before.index()], StepStatus::Completed);
            }
            for after in &Step::ALL[step.index() + 1..] {
                assert_eq!(board.statuses[after.index()], StepStatus::Waiting);
            }
        }
    }

    #[test]
    fn new_board_is_all_waiting() {
        let board = StepBoard::new();
        for step in Step::ALL {
            assert_eq!(board.statuses[step.index()], StepStatus::Waiting);
        }
        assert_eq!(board.active(), None);
    }

    #[test]
    fn advance_walks_steps_forward() {
        let mut board = StepBoard::new();
        let t = board.advance(Step::DataLoading);
        assert_eq!(t, vec![StepTransition::Started(Step::DataLoading)]);
        assert_invariant(&board);

        let t = board.advance(Step::TagExtraction);
        assert_eq!(
            t,
            vec![
                StepTransition::Completed(Step::DataLoading),
                StepTransition::Started(Step::TagExtraction),
            ]
        );
        assert_invariant(&board);
    }

    #[test]
    fn advance_over_skipped_step_completes_it() {
        let mut board = StepBoard::new();
        board.advance(Step::DataLoading);
        let t = board.advance(Step::TagNormalization);
        assert_eq!(
            t,
            vec![
                StepTransition::Completed(Step::DataLoading),
                StepTransition::Completed(Step::TagExtraction),
                StepTransition::Started(Step::TagNormalization),
            ]
        );
        assert_invariant(&board);
    }

    #[test]
    fn advance_never_regresses() {
        let mut board = StepBoard::new();
        board.advance(Step::TagNormalization);
        assert!(board.advance(Step::TagExtraction).is_empty());
        assert_eq!(board.active(), Some(Step::TagNormalization));
        assert_invariant(&board);
    }

    #[test]
    fn repeated_observation_is_a_noop() {
        let mut board = StepBoard::new();
        board.advance(Step::TagExtraction);
        assert!(board.advance(Step::TagExtraction).is_empty());
        assert_eq!(board.statuses[Step::TagExtraction.index()], StepStatus::Active);
    }

    #[test]
    fn finish_completes_the_active_step() {
        let mut board = StepBoard::new();
        board.advance(Step::SynthesisGeneration);
        assert_eq!(board.finish(), Some(Step::SynthesisGeneration));
        assert_eq!(
            board.statuses[Step::SynthesisGeneration.index()],
            StepStatus::Completed
        );
        assert_eq!(board.active(), None);
    }

    #[test]
    fn finish_without_active_step_is_a_noop() {
        let mut board = StepBoard::new();
        assert_eq!(board.finish(), None);
    }

    #[test]
    fn fail_marks_the_active_step() {
        let mut board = StepBoard::new();
        board.advance(Step::TagExtraction);
        assert_eq!(board.fail(), Step::TagExtraction);
        assert_eq!(board.statuses[Step::TagExtraction.index()], StepStatus::Error);
        // Later steps never started.
        assert_eq!(
            board.statuses[Step::TagNormalization.index()],
            StepStatus::Waiting
        );
    }

    #[test]
    fn fail_before_any_step_hits_the_first_one() {
        let mut board = StepBoard::new();
        assert_eq!(board.fail(), Step::DataLoading);
        assert_eq!(board.statuses[Step::DataLoading.index()], StepStatus::Error);
        assert_eq!(board.statuses[Step::TagExtraction.index()], StepStatus::Waiting);
    }

    #[test]
    fn unhinted_logs_attach_to_the_active_step() {
        let mut board = StepBoard::new();
        board.advance(Step::TagExtraction);
        assert_eq!(board.attribute_log(None), Step::TagExtraction);
        assert_eq!(
            board.attribute_log(Some(Step::TagNormalization)),
            Step::TagNormalization
        );
    }

    #[test]
    fn early_logs_attach_to_the_first_step() {
        let board = StepBoard::new();
        assert_eq!(board.attribute_log(None), Step::DataLoading);
    }
}
