use crate::debate::{DebateMessage, Speaker};
use serde::{Deserialize, Serialize};

/// Chat roles shared by the OpenAI and Anthropic message schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Maps debate speakers onto one provider's chat roles.
///
/// The adapter's own statements are its prior output (`assistant`); the opponent's
/// statements arrive as `user` turns. Judge messages are never part of a debater's
/// history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleTable {
    own: Speaker,
}

impl RoleTable {
    pub const fn new(own: Speaker) -> Self {
        Self { own }
    }

    pub fn own(&self) -> Speaker {
        self.own
    }

    pub fn role_for(&self, speaker: Speaker) -> Option<ChatRole> {
        if speaker == self.own {
            Some(ChatRole::Assistant)
        } else if Some(speaker) == self.own.opponent() {
            Some(ChatRole::User)
        } else {
            None
        }
    }

    /// History in provider roles, dropping anything the table has no role for.
    pub fn map_history<'a>(&self, history: &'a [DebateMessage]) -> Vec<(ChatRole, &'a str)> {
        history
            .iter()
            .filter_map(|m| self.role_for(m.role).map(|role| (role, m.content.as_str())))
            .collect()
    }
}

/// Debater A speaks through OpenAI.
pub const OPENAI_ROLES: RoleTable = RoleTable::new(Speaker::DebaterA);
/// Debater B speaks through Anthropic.
pub const ANTHROPIC_ROLES: RoleTable = RoleTable::new(Speaker::DebaterB);
