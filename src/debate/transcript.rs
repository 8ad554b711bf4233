use crate::debate::verdict::Verdict;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Speaker {
    DebaterA,
    DebaterB,
    Judge,
}

impl Speaker {
    /// Parse a role name sent by a client. Besides the canonical names this accepts
    /// the provider labels the browser client has always sent (`GPT`, `CLAUDE`,
    /// `GEMINI`). Anything else is not a debate role.
    pub fn from_wire(role: &str) -> Option<Self> {
        match role.trim().to_ascii_uppercase().as_str() {
            "DEBATER_A" | "GPT" => Some(Self::DebaterA),
            "DEBATER_B" | "CLAUDE" => Some(Self::DebaterB),
            "JUDGE" | "GEMINI" => Some(Self::Judge),
            _ => None,
        }
    }

    /// The other debater. The judge has no opponent.
    pub fn opponent(self) -> Option<Self> {
        match self {
            Self::DebaterA => Some(Self::DebaterB),
            Self::DebaterB => Some(Self::DebaterA),
            Self::Judge => None,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DebaterA => write!(f, "DEBATER_A"),
            Self::DebaterB => write!(f, "DEBATER_B"),
            Self::Judge => write!(f, "JUDGE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateMessage {
    pub role: Speaker,
    pub content: String,
    /// 1-indexed.
    pub round: u32,
}

impl DebateMessage {
    pub fn new(role: Speaker, content: impl Into<String>, round: u32) -> Self {
        Self {
            role,
            content: content.into(),
            round,
        }
    }
}

/// Append-only, chronologically ordered statements of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<DebateMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: DebateMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[DebateMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Texts spoken by `speaker`, oldest first.
    pub fn statements_by(&self, speaker: Speaker) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.role == speaker)
            .map(|m| m.content.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One debate, from start command to verdict. Lives only in memory.
#[derive(Debug, Clone)]
pub struct DebateRun {
    pub id: RunId,
    pub subject_a: String,
    pub subject_b: String,
    pub rounds: u32,
    pub transcript: Transcript,
    pub verdict: Option<Verdict>,
}

impl DebateRun {
    pub fn new(subject_a: impl Into<String>, subject_b: impl Into<String>, rounds: u32) -> Self {
        Self {
            id: RunId::new(),
            subject_a: subject_a.into(),
            subject_b: subject_b.into(),
            rounds,
            transcript: Transcript::new(),
            verdict: None,
        }
    }
}
