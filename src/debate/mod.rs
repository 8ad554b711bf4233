pub mod orchestrator;
pub mod transcript;
pub mod verdict;

pub use orchestrator::{unavailable_statement, CancelHandle, DebateOrchestrator, DebatePhase};
pub use transcript::{DebateMessage, DebateRun, RunId, Speaker, Transcript};
pub use verdict::{judge_prompt, parse_winner, Verdict, Winner};
