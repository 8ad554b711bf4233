//! Debate state machine: two debaters alternate for a fixed number of rounds, then
//! the judge reads both sides.

use crate::ai::provider::{Debater, Judge, Providers, VerdictRequest};
use crate::config::DebateConfig;
use crate::debate::transcript::{DebateMessage, DebateRun, Speaker};
use crate::debate::verdict::Verdict;
use crate::error::{ArenaError, ArenaResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Phase of a debate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebatePhase {
    /// No run started, or the previous run was discarded.
    Idle,
    /// Debaters are exchanging statements in this (1-indexed) round.
    RoundInProgress(u32),
    /// All rounds are in; waiting on the judge.
    Judging,
    /// Verdict stored.
    Done,
    /// Judge failure or cancellation.
    Failed,
}

impl DebatePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `start` may be called from this phase.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::RoundInProgress(round) => write!(f, "round_{}", round),
            Self::Judging => write!(f, "judging"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Shared flag that stops a run at its next transition.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Transcript entry recorded when a debater fails to answer.
pub fn unavailable_statement(speaker: Speaker) -> String {
    format!("[no argument: {} unavailable]", speaker)
}

pub struct DebateOrchestrator {
    debater_a: Arc<dyn Debater>,
    debater_b: Arc<dyn Debater>,
    judge: Arc<dyn Judge>,
    max_rounds: u32,
    phase: DebatePhase,
    run: Option<DebateRun>,
    cancel: CancelHandle,
}

impl DebateOrchestrator {
    pub fn new(
        debater_a: Arc<dyn Debater>,
        debater_b: Arc<dyn Debater>,
        judge: Arc<dyn Judge>,
        max_rounds: u32,
    ) -> Self {
        Self {
            debater_a,
            debater_b,
            judge,
            max_rounds: max_rounds.max(1),
            phase: DebatePhase::Idle,
            run: None,
            cancel: CancelHandle::new(),
        }
    }

    pub fn from_providers(providers: &Providers, config: &DebateConfig) -> Self {
        Self::new(
            Arc::clone(&providers.debater_a),
            Arc::clone(&providers.debater_b),
            Arc::clone(&providers.judge),
            config.max_rounds,
        )
    }

    pub fn phase(&self) -> DebatePhase {
        self.phase
    }

    pub fn run_state(&self) -> Option<&DebateRun> {
        self.run.as_ref()
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Handle for the current run. Each `start` issues a fresh one.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Begin a new run, discarding any previous transcript and verdict.
    pub fn start(&mut self, subject_a: &str, subject_b: &str, rounds: u32) -> ArenaResult<&DebateRun> {
        if !self.phase.can_start() {
            return Err(ArenaError::InvalidState(format!(
                "cannot start a debate while {}",
                self.phase
            )));
        }
        let subject_a = subject_a.trim();
        let subject_b = subject_b.trim();
        if subject_a.is_empty() || subject_b.is_empty() {
            return Err(ArenaError::validation("Both debate subjects are required"));
        }
        if rounds == 0 || rounds > self.max_rounds {
            return Err(ArenaError::validation(format!(
                "rounds must be between 1 and {}",
                self.max_rounds
            )));
        }

        self.cancel = CancelHandle::new();
        self.phase = DebatePhase::RoundInProgress(1);
        let run = self.run.insert(DebateRun::new(subject_a, subject_b, rounds));

        tracing::info!(run_id = %run.id, subject_a, subject_b, rounds, "Debate started");
        Ok(run)
    }

    /// Perform one provider call and the transition that follows it.
    pub async fn step(&mut self) -> ArenaResult<DebatePhase> {
        let phase = self.phase;
        let run = match (&mut self.run, phase) {
            (Some(run), DebatePhase::RoundInProgress(_) | DebatePhase::Judging) => run,
            _ => {
                return Err(ArenaError::InvalidState(format!(
                    "no step possible while {}",
                    phase
                )))
            }
        };

        if self.cancel.is_cancelled() {
            self.phase = DebatePhase::Failed;
            tracing::info!(run_id = %run.id, from = %phase, "Debate cancelled");
            return Err(ArenaError::Cancelled(run.id.to_string()));
        }

        match phase {
            DebatePhase::RoundInProgress(round) => {
                // A speaks on even transcript lengths, B answers on odd ones.
                let (speaker, debater, subject) = if run.transcript.len() % 2 == 0 {
                    (Speaker::DebaterA, &self.debater_a, run.subject_a.as_str())
                } else {
                    (Speaker::DebaterB, &self.debater_b, run.subject_b.as_str())
                };

                let content = match debater.argue(run.transcript.messages(), subject).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(run_id = %run.id, %speaker, round, error = %e, "Debater failed, continuing");
                        unavailable_statement(speaker)
                    }
                };
                tracing::debug!(run_id = %run.id, %speaker, round, length = content.len(), "Statement recorded");
                run.transcript.push(DebateMessage::new(speaker, content, round));

                self.phase = match speaker {
                    Speaker::DebaterB if round >= run.rounds => DebatePhase::Judging,
                    Speaker::DebaterB => DebatePhase::RoundInProgress(round + 1),
                    _ => DebatePhase::RoundInProgress(round),
                };
            }
            DebatePhase::Judging => {
                let request = VerdictRequest {
                    subject_a: run.subject_a.clone(),
                    subject_b: run.subject_b.clone(),
                    arguments_a: run.transcript.statements_by(Speaker::DebaterA),
                    arguments_b: run.transcript.statements_by(Speaker::DebaterB),
                };

                match self.judge.judge(&request).await {
                    Ok(text) => {
                        let verdict = Verdict::from_judge_text(&text, &run.subject_a, &run.subject_b);
                        tracing::info!(run_id = %run.id, winner = ?verdict.winner, "Verdict reached");
                        run.verdict = Some(verdict);
                        self.phase = DebatePhase::Done;
                    }
                    Err(e) => {
                        self.phase = DebatePhase::Failed;
                        return Err(e);
                    }
                }
            }
            _ => {}
        }

        Ok(self.phase)
    }

    /// Step until the run is done or has failed.
    pub async fn run(&mut self) -> ArenaResult<&DebateRun> {
        while !self.phase.is_terminal() {
            self.step().await?;
        }
        self.run
            .as_ref()
            .ok_or_else(|| ArenaError::InvalidState("debate finished without a run".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{MockDebater, MockJudge};
    use crate::debate::verdict::Winner;
    use crate::error::{ProviderErrorKind, ProviderName};

    fn echo_debater(label: &'static str) -> MockDebater {
        let mut debater = MockDebater::new();
        debater
            .expect_argue()
            .returning(move |history, _| Ok(format!("{}{}", label, history.len())));
        debater
    }

    fn fixed_judge(text: &'static str) -> MockJudge {
        let mut judge = MockJudge::new();
        judge.expect_judge().returning(move |_| Ok(text.to_string()));
        judge
    }

    fn orchestrator(a: MockDebater, b: MockDebater, judge: MockJudge) -> DebateOrchestrator {
        DebateOrchestrator::new(Arc::new(a), Arc::new(b), Arc::new(judge), 3)
    }

    fn unauthorized() -> ArenaError {
        ArenaError::Provider {
            provider: ProviderName::Gemini,
            kind: ProviderErrorKind::Unauthorized,
            message: "API key not valid".to_string(),
            details: None,
            source_url: None,
        }
    }

    #[tokio::test]
    async fn transcript_alternates_with_round_numbers() {
        let mut orch = orchestrator(echo_debater("a"), echo_debater("b"), fixed_judge("WINNER: Pikachu"));
        orch.start("Pikachu", "Charizard", 3).unwrap();
        let run = orch.run().await.unwrap();

        let roles: Vec<Speaker> = run.transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Speaker::DebaterA,
                Speaker::DebaterB,
                Speaker::DebaterA,
                Speaker::DebaterB,
                Speaker::DebaterA,
                Speaker::DebaterB
            ]
        );
        let rounds: Vec<u32> = run.transcript.messages().iter().map(|m| m.round).collect();
        assert_eq!(rounds, vec![1, 1, 2, 2, 3, 3]);
        // Each debater saw everything said before it.
        let contents: Vec<&str> = run.transcript.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a0", "b1", "a2", "b3", "a4", "b5"]);
        assert_eq!(run.verdict.as_ref().unwrap().winner, Winner::SubjectA);
        assert_eq!(orch.phase(), DebatePhase::Done);
    }

    #[tokio::test]
    async fn step_is_one_call_per_transition() {
        let mut orch = orchestrator(echo_debater("a"), echo_debater("b"), fixed_judge("WINNER: Charizard"));
        orch.start("Pikachu", "Charizard", 1).unwrap();
        assert_eq!(orch.phase(), DebatePhase::RoundInProgress(1));

        assert_eq!(orch.step().await.unwrap(), DebatePhase::RoundInProgress(1));
        assert_eq!(orch.run_state().unwrap().transcript.len(), 1);
        assert_eq!(orch.step().await.unwrap(), DebatePhase::Judging);
        assert_eq!(orch.run_state().unwrap().transcript.len(), 2);
        assert!(orch.run_state().unwrap().verdict.is_none());
        assert_eq!(orch.step().await.unwrap(), DebatePhase::Done);

        assert!(matches!(orch.step().await, Err(ArenaError::InvalidState(_))));
    }

    #[tokio::test]
    async fn judge_sees_each_side_in_order() {
        let mut judge = MockJudge::new();
        judge
            .expect_judge()
            .withf(|req: &VerdictRequest| {
                req.subject_a == "Pikachu"
                    && req.arguments_a == vec!["a0".to_string(), "a2".to_string()]
                    && req.arguments_b == vec!["b1".to_string(), "b3".to_string()]
            })
            .times(1)
            .returning(|_| Ok("Close call.".to_string()));

        let mut orch = orchestrator(echo_debater("a"), echo_debater("b"), judge);
        orch.start("Pikachu", "Charizard", 2).unwrap();
        let verdict = orch.run().await.unwrap().verdict.clone().unwrap();
        assert_eq!(verdict.winner, Winner::NoDecision);
        assert!(verdict.text.ends_with("WINNER: No decision"));
    }

    #[tokio::test]
    async fn debater_failure_records_placeholder() {
        let mut failing = MockDebater::new();
        failing.expect_argue().times(1).returning(|_, _| Err(unauthorized()));

        let mut orch = orchestrator(echo_debater("a"), failing, fixed_judge("WINNER: Pikachu"));
        orch.start("Pikachu", "Charizard", 1).unwrap();
        let run = orch.run().await.unwrap();

        assert_eq!(run.transcript.messages()[1].content, "[no argument: DEBATER_B unavailable]");
        assert_eq!(orch.phase(), DebatePhase::Done);
    }

    #[tokio::test]
    async fn judge_failure_fails_the_run() {
        let mut judge = MockJudge::new();
        judge.expect_judge().times(1).returning(|_| Err(unauthorized()));

        let mut orch = orchestrator(echo_debater("a"), echo_debater("b"), judge);
        orch.start("Pikachu", "Charizard", 1).unwrap();
        let err = orch.run().await.unwrap_err();

        assert_eq!(err.status_code(), 401);
        assert_eq!(orch.phase(), DebatePhase::Failed);
        assert_eq!(orch.run_state().unwrap().transcript.len(), 2);
        assert!(orch.run_state().unwrap().verdict.is_none());
    }

    #[tokio::test]
    async fn cancelled_run_stops_before_next_call() {
        let mut a = MockDebater::new();
        a.expect_argue().times(1).returning(|_, _| Ok("Thunderbolt.".to_string()));
        let mut b = MockDebater::new();
        b.expect_argue().times(0);
        let mut judge = MockJudge::new();
        judge.expect_judge().times(0);

        let mut orch = orchestrator(a, b, judge);
        orch.start("Pikachu", "Charizard", 2).unwrap();
        let handle = orch.cancel_handle();
        orch.step().await.unwrap();
        handle.cancel();

        assert!(matches!(orch.step().await, Err(ArenaError::Cancelled(_))));
        assert_eq!(orch.phase(), DebatePhase::Failed);
    }

    #[tokio::test]
    async fn restart_clears_previous_run() {
        let mut orch = orchestrator(echo_debater("a"), echo_debater("b"), fixed_judge("WINNER: Pikachu"));
        orch.start("Pikachu", "Charizard", 1).unwrap();
        let first_id = orch.run().await.unwrap().id;
        let old_handle = orch.cancel_handle();

        let run = orch.start("Mew", "Mewtwo", 1).unwrap();
        assert_ne!(run.id, first_id);
        assert!(run.transcript.is_empty());
        assert!(run.verdict.is_none());

        // Cancelling the finished run does not reach the new one.
        old_handle.cancel();
        assert!(orch.step().await.is_ok());
    }

    #[tokio::test]
    async fn start_validates_input() {
        let mut a = MockDebater::new();
        a.expect_argue().times(0);
        let mut orch = orchestrator(a, MockDebater::new(), MockJudge::new());

        assert!(matches!(orch.start("Pikachu", "Charizard", 0), Err(ArenaError::Validation(_))));
        assert!(matches!(orch.start("Pikachu", "Charizard", 4), Err(ArenaError::Validation(_))));
        assert!(matches!(orch.start("  ", "Charizard", 1), Err(ArenaError::Validation(_))));
        assert_eq!(orch.phase(), DebatePhase::Idle);
        assert!(matches!(orch.step().await, Err(ArenaError::InvalidState(_))));
    }

    #[tokio::test]
    async fn start_refused_mid_run() {
        let mut orch = orchestrator(echo_debater("a"), echo_debater("b"), fixed_judge("WINNER: Pikachu"));
        orch.start("Pikachu", "Charizard", 1).unwrap();
        orch.step().await.unwrap();
        assert!(matches!(orch.start("Mew", "Mewtwo", 1), Err(ArenaError::InvalidState(_))));
    }
}
