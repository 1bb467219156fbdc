//! Pipeline stage registry and stage extraction.
//!
//! This module provides:
//! - `StageId` — the fixed nine-stage delivery sequence with ordinals
//! - `AgentProfile` — per-stage agent metadata (display name, icon)
//! - `extract_stage` / `extract_stage_token` — stage-token extraction
//!   from free-text issue titles
//!
//! The sequence is linear and immutable: `L1` through `L9`, each owned by
//! a named virtual agent role. There is no persistence here; the stage a
//! pipeline is in lives in the issue tracker.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::StageParseError;

/// One discrete phase of the fixed delivery pipeline.
///
/// Ordinals are 1-based, contiguous, and strictly increasing by
/// construction; the type system rules out duplicate or invalid stage
/// identifiers. Use `FromStr` to get from a raw token to a `StageId` —
/// a failed parse is the "not in sequence" condition, which is distinct
/// from `next()` returning `None` ("this is the last stage").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageId {
    L1,
    L2,
    L3,
    L4,
    L5,
    L6,
    L7,
    L8,
    L9,
}

/// Metadata for the virtual agent that owns a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: &'static str,
    pub emoji: &'static str,
}

impl StageId {
    /// The full pipeline sequence, in order.
    pub const ALL: [StageId; 9] = [
        StageId::L1,
        StageId::L2,
        StageId::L3,
        StageId::L4,
        StageId::L5,
        StageId::L6,
        StageId::L7,
        StageId::L8,
        StageId::L9,
    ];

    /// 1-based position in the pipeline sequence.
    pub fn ordinal(self) -> u8 {
        self as u8 + 1
    }

    /// Look up a stage by its 1-based ordinal.
    pub fn from_ordinal(ordinal: u8) -> Option<StageId> {
        let index = usize::from(ordinal).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    /// The stage that follows this one, or `None` if this is the last.
    pub fn next(self) -> Option<StageId> {
        Self::from_ordinal(self.ordinal() + 1)
    }

    /// The stage token as it appears in issue titles.
    pub fn as_str(self) -> &'static str {
        match self {
            StageId::L1 => "L1",
            StageId::L2 => "L2",
            StageId::L3 => "L3",
            StageId::L4 => "L4",
            StageId::L5 => "L5",
            StageId::L6 => "L6",
            StageId::L7 => "L7",
            StageId::L8 => "L8",
            StageId::L9 => "L9",
        }
    }

    /// Metadata for the agent that owns this stage.
    ///
    /// The exhaustive match guarantees every stage has an entry.
    pub fn agent(self) -> AgentProfile {
        match self {
            StageId::L1 => AgentProfile {
                name: "Alex Requirements",
                emoji: "\u{1F3AF}",
            },
            StageId::L2 => AgentProfile {
                name: "Sam Architecture",
                emoji: "\u{1F3E2}\u{FE0F}",
            },
            StageId::L3 => AgentProfile {
                name: "Luna Design",
                emoji: "\u{1F3A8}",
            },
            StageId::L4 => AgentProfile {
                name: "Morgan Backend",
                emoji: "\u{2699}\u{FE0F}",
            },
            StageId::L5 => AgentProfile {
                name: "River Frontend",
                emoji: "\u{1F4BB}",
            },
            StageId::L6 => AgentProfile {
                name: "Quinn Testing",
                emoji: "\u{1F50D}",
            },
            StageId::L7 => AgentProfile {
                name: "Phoenix Deploy",
                emoji: "\u{1F680}",
            },
            StageId::L8 => AgentProfile {
                name: "Sage Monitor",
                emoji: "\u{1F4CA}",
            },
            StageId::L9 => AgentProfile {
                name: "Echo Documentation",
                emoji: "\u{1F4DA}",
            },
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageId {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L1" => Ok(StageId::L1),
            "L2" => Ok(StageId::L2),
            "L3" => Ok(StageId::L3),
            "L4" => Ok(StageId::L4),
            "L5" => Ok(StageId::L5),
            "L6" => Ok(StageId::L6),
            "L7" => Ok(StageId::L7),
            "L8" => Ok(StageId::L8),
            "L9" => Ok(StageId::L9),
            other => Err(StageParseError(other.to_string())),
        }
    }
}

// Compiled once; uppercase L and the trailing colon are both required.
static STAGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(L\d+):").unwrap());

/// Extract the leftmost raw stage token (`L<digits>` followed by `:`)
/// from an issue title, without checking it against the sequence.
///
/// The router uses this layer to tell "no token at all" apart from
/// "token present but not a pipeline stage".
pub fn extract_stage_token(title: &str) -> Option<&str> {
    STAGE_TOKEN
        .captures(title)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Extract the pipeline stage named by an issue title.
///
/// Returns `None` when the title carries no stage token, and also when
/// the token does not name a stage in the sequence (e.g. `L12:`). Pure
/// function, no side effects.
pub fn extract_stage(title: &str) -> Option<StageId> {
    extract_stage_token(title).and_then(|token| token.parse().ok())
}
