//! Judge prompt construction and verdict parsing.
//!
//! The judge is asked to finish with a `WINNER: <name>` line. Models do not always
//! comply, so parsing is lenient about decoration and strict about identity: the
//! declared name must match exactly one of the two subjects, otherwise the verdict
//! is [`Winner::NoDecision`].

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

pub const WINNER_MARKER: &str = "WINNER:";
pub const NO_DECISION: &str = "No decision";

pub const DEFAULT_JUDGE_PROMPT: &str = r#"You are a wise and ancient wizard, acting as a fair and impartial judge in a debate between two contenders.
With deep knowledge and keen insight, you carefully listen to the arguments made by two debaters.
Like a sage who sees beyond mere words, you evaluate their logic, reasoning, and evidence before rendering a final judgment on which contender is truly superior.
Your decision must be based on the debate, not personal bias, and you always add a little humor to your judgment.
Summarize the key points from both sides with the wisdom of an oracle and declare the winner in a maximum of 3 sentences.
Your final proclamation must end with: WINNER: [NAME OF THE CONTENDER WHO WON THE DEBATE].

The first debater's arguments for {subject_a}: {arguments_a}
The second debater's arguments for {subject_b}: {arguments_b}"#;

static MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwinner\s*:\s*(.*)$").expect("marker pattern is valid"));

/// Build the judge prompt. Arguments are joined with ` | ` in speaking order.
pub fn judge_prompt(
    template: Option<&str>,
    subject_a: &str,
    subject_b: &str,
    arguments_a: &[String],
    arguments_b: &[String],
) -> String {
    template
        .unwrap_or(DEFAULT_JUDGE_PROMPT)
        .replace("{subject_a}", subject_a)
        .replace("{subject_b}", subject_b)
        .replace("{arguments_a}", &arguments_a.join(" | "))
        .replace("{arguments_b}", &arguments_b.join(" | "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    SubjectA,
    SubjectB,
    NoDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Judge output; always carries a `WINNER:` line.
    pub text: String,
    pub winner: Winner,
}

impl Verdict {
    pub fn from_judge_text(text: &str, subject_a: &str, subject_b: &str) -> Self {
        let trimmed = text.trim_end();
        let declared = declared_winner(trimmed);
        let winner = declared
            .as_deref()
            .map(|name| match_subject(name, subject_a, subject_b))
            .unwrap_or(Winner::NoDecision);

        let text = match declared {
            Some(_) => trimmed.to_string(),
            None if trimmed.is_empty() => format!("{} {}", WINNER_MARKER, NO_DECISION),
            None => format!("{}\n\n{} {}", trimmed, WINNER_MARKER, NO_DECISION),
        };

        Self { text, winner }
    }

    pub fn winner_name<'a>(&self, subject_a: &'a str, subject_b: &'a str) -> Option<&'a str> {
        match self.winner {
            Winner::SubjectA => Some(subject_a),
            Winner::SubjectB => Some(subject_b),
            Winner::NoDecision => None,
        }
    }
}

/// The cleaned name from the last `WINNER:` line. A blank last marker declares
/// nobody, even if an earlier one named someone.
pub fn declared_winner(text: &str) -> Option<String> {
    let caps = text.lines().rev().find_map(|line| MARKER_LINE.captures(line))?;
    let name = clean_name(caps.get(1)?.as_str());
    (!name.is_empty()).then_some(name)
}

/// Decide which subject the judge declared.
pub fn parse_winner(text: &str, subject_a: &str, subject_b: &str) -> Winner {
    declared_winner(text)
        .map(|name| match_subject(&name, subject_a, subject_b))
        .unwrap_or(Winner::NoDecision)
}

fn clean_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '[' | ']' | '*' | '_' | '"' | '\'' | '.' | '!' | '`')
        })
        .to_string()
}

fn match_subject(declared: &str, subject_a: &str, subject_b: &str) -> Winner {
    if declared.eq_ignore_ascii_case(subject_a.trim()) {
        return Winner::SubjectA;
    }
    if declared.eq_ignore_ascii_case(subject_b.trim()) {
        return Winner::SubjectB;
    }

    // "Pikachu, by a landslide" still names Pikachu, but only if the other subject
    // is not mentioned as well.
    match (mentions(declared, subject_a), mentions(declared, subject_b)) {
        (true, false) => Winner::SubjectA,
        (false, true) => Winner::SubjectB,
        _ => Winner::NoDecision,
    }
}

fn mentions(haystack: &str, subject: &str) -> bool {
    let subject = subject.trim();
    if subject.is_empty() {
        return false;
    }
    Regex::new(&format!(r"(?i)(^|\W){}($|\W)", regex::escape(subject)))
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}
