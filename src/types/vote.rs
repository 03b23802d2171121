use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{answer::AnswerId, question::QuestionId};

/// The two things a vote can be cast on, as stored in `votes.target_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Question,
    Answer,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Question => "question",
            TargetKind::Answer => "answer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "question" => Some(TargetKind::Question),
            "answer" => Some(TargetKind::Answer),
            _ => None,
        }
    }

    /// Name used in not-found errors.
    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Question => "Question",
            TargetKind::Answer => "Answer",
        }
    }
}

/// An entity that can receive votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteTarget {
    Question(QuestionId),
    Answer(AnswerId),
}

impl VoteTarget {
    pub fn new(kind: TargetKind, id: i32) -> Self {
        match kind {
            TargetKind::Question => VoteTarget::Question(QuestionId(id)),
            TargetKind::Answer => VoteTarget::Answer(AnswerId(id)),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            VoteTarget::Question(_) => TargetKind::Question,
            VoteTarget::Answer(_) => TargetKind::Answer,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            VoteTarget::Question(id) => id.0,
            VoteTarget::Answer(id) => id.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i16(self) -> i16 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(VoteValue::Up),
            -1 => Some(VoteValue::Down),
            _ => None,
        }
    }
}

/// How casting `requested` changes the ledger, given the vote already
/// held by the same account on the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// No previous vote: a row is inserted.
    Cast(VoteValue),
    /// Same vote again: the row is deleted.
    Retract(VoteValue),
    /// Opposite vote: the row is updated in place.
    Switch { from: VoteValue, to: VoteValue },
}

impl VoteChange {
    pub fn resolve(existing: Option<VoteValue>, requested: VoteValue) -> Self {
        match existing {
            None => VoteChange::Cast(requested),
            Some(current) if current == requested => VoteChange::Retract(current),
            Some(current) => VoteChange::Switch {
                from: current,
                to: requested,
            },
        }
    }

    /// The vote held after the change is applied.
    pub fn resulting_vote(self) -> Option<VoteValue> {
        match self {
            VoteChange::Cast(value) => Some(value),
            VoteChange::Retract(_) => None,
            VoteChange::Switch { to, .. } => Some(to),
        }
    }

    pub fn rating_delta(self) -> i64 {
        match self {
            VoteChange::Cast(value) => i64::from(value.as_i16()),
            VoteChange::Retract(value) => -i64::from(value.as_i16()),
            VoteChange::Switch { from, to } => i64::from(to.as_i16() - from.as_i16()),
        }
    }
}

/// The caller's vote as shown next to a rating: -1, 0 or 1.
pub fn user_vote_value(vote: Option<VoteValue>) -> i16 {
    vote.map_or(0, VoteValue::as_i16)
}

/// Reads a vote from the submitted form fields `target`, `id` and `value`.
/// Returns `None` for anything malformed: a non-integer id or value, a
/// value other than 1 or -1, or an unknown target.
pub fn extract_vote(params: &HashMap<String, String>) -> Option<(VoteTarget, VoteValue)> {
    let id = params.get("id")?.trim().parse::<i32>().ok()?;
    let value = params.get("value")?.trim().parse::<i16>().ok()?;
    let value = VoteValue::from_i16(value)?;
    let kind = TargetKind::parse(params.get("target")?)?;

    Some((VoteTarget::new(kind, id), value))
}
