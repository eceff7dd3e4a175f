//! Keyword fallback for questions the model can't answer unaided
//!
//! Only consulted when the model produced no structured tool request.
//! Matching is per token, so "sometimes" does not count as "time".

use serde_json::Value;

const TIME_TOKENS: &[&str] = &["time", "clock", "date", "timestamp"];
const JOKE_TOKENS: &[&str] = &["joke", "jokes", "funny", "laugh", "humor", "humour", "pun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackIntent {
    Time,
    Joke,
}

impl FallbackIntent {
    pub fn server(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Joke => "joke",
        }
    }

    pub fn tool(&self) -> &'static str {
        match self {
            Self::Time => "get_current_time",
            Self::Joke => "get_random_joke",
        }
    }

    /// Reply text from the tool's JSON result; `None` if the fields are missing
    pub fn render(&self, result: &str) -> Option<String> {
        let payload: Value = serde_json::from_str(result).ok()?;
        match self {
            Self::Time => {
                if let Some(readable) = payload.get("human_readable").and_then(Value::as_str) {
                    Some(format!("🕐 The current time is {}.", readable))
                } else {
                    let day = payload.get("day_of_week").and_then(Value::as_str)?;
                    Some(format!("📅 Today is {}.", day))
                }
            }
            Self::Joke => {
                let setup = payload.get("setup").and_then(Value::as_str)?;
                let punchline = payload.get("punchline").and_then(Value::as_str)?;
                Some(format!("{}\n\n{} 😄", setup, punchline))
            }
        }
    }
}

fn tokens(message: &str) -> Vec<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Time wins over humor when both match
pub fn detect_intent(message: &str) -> Option<FallbackIntent> {
    let tokens = tokens(message);
    let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));
    let what_day = tokens.windows(2).any(|w| w[0] == "what" && w[1] == "day");

    if has(TIME_TOKENS) || what_day {
        Some(FallbackIntent::Time)
    } else if has(JOKE_TOKENS) {
        Some(FallbackIntent::Joke)
    } else {
        None
    }
}
