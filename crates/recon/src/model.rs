use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classify::Agreement;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A raw trip record from the AVL/vehicle-telemetry feed.
///
/// Fields arrive as loosely-shaped strings; anything missing degrades to an
/// empty string. Normalization is the only place that interprets them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AvlTrip {
    pub id: String,
    /// Line label with a leading numeric pattern, e.g. "100.2 - Paranoá / Plano Piloto".
    #[serde(default)]
    pub line_name: String,
    /// Direction text, e.g. "IDA" / "VOLTA".
    #[serde(default)]
    pub direction: String,
    /// Duty/run number as reported, e.g. "3".
    #[serde(default)]
    pub service: String,
    /// Planned departure, "26/10/2025 15:40:00" or bare "15:40:00".
    #[serde(default)]
    pub departure: String,
    /// Realized departure, informational only.
    #[serde(default)]
    pub departure_actual: String,
}

/// A raw trip record from the scheduling/payroll roster.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RosterTrip {
    pub id: String,
    /// Line code, possibly zero-padded, e.g. "0026".
    #[serde(default)]
    pub line_code: String,
    #[serde(default)]
    pub line_name: String,
    /// Single-character direction flag ("C"/"I"/"V") or free text.
    #[serde(default)]
    pub direction_flag: String,
    /// Duty number, zero-padded at the source, e.g. "01".
    #[serde(default)]
    pub service_code: String,
    /// Departure clock, "06:07:01" or "01/01/1900 06:07:01".
    #[serde(default)]
    pub departure: String,
    /// Depot/sector label, informational only.
    #[serde(default)]
    pub sector: String,
}

/// Pre-loaded record collections for one reference date.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub avl: Vec<AvlTrip>,
    pub roster: Vec<RosterTrip>,
}

// ---------------------------------------------------------------------------
// Normalized form
// ---------------------------------------------------------------------------

/// Source-independent comparable view of a trip.
///
/// `line` is digits-only, `direction` is drawn from a small fixed vocabulary
/// (IDA/VOLTA, unrecognized values pass through uppercased), `service` is the
/// source's duty number string, `time` is "HH:MM" or empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTrip {
    pub line: String,
    pub direction: String,
    pub service: String,
    pub time: String,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Overall verdict for one outcome record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Paired and agreeing on all four fields.
    Compatible,
    /// Paired, only the scheduled time differs.
    TimeDivergent,
    /// Paired with any other disagreement.
    Divergent,
    /// AVL record with no roster counterpart.
    AvlOnly,
    /// Roster record with no AVL counterpart.
    RosterOnly,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compatible => write!(f, "compatible"),
            Self::TimeDivergent => write!(f, "time_divergent"),
            Self::Divergent => write!(f, "divergent"),
            Self::AvlOnly => write!(f, "avl_only"),
            Self::RosterOnly => write!(f, "roster_only"),
        }
    }
}

/// Which matching pass produced a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    ExactFirstFit,
    KeyedNearestTime,
    RelaxedLineService,
    RelaxedLineDirection,
    RelaxedLine,
}

impl std::fmt::Display for MatchPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactFirstFit => write!(f, "exact_first_fit"),
            Self::KeyedNearestTime => write!(f, "keyed_nearest_time"),
            Self::RelaxedLineService => write!(f, "relaxed_line_service"),
            Self::RelaxedLineDirection => write!(f, "relaxed_line_direction"),
            Self::RelaxedLine => write!(f, "relaxed_line"),
        }
    }
}

/// Normalized view of one side of an outcome, with its source id.
#[derive(Debug, Clone, Serialize)]
pub struct TripSnapshot {
    pub id: String,
    pub line: String,
    pub direction: String,
    pub service: String,
    pub time: String,
    /// Realized departure, carried through where the source reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_actual: Option<String>,
}

impl TripSnapshot {
    pub fn new(id: &str, norm: &NormalizedTrip) -> Self {
        Self {
            id: id.to_string(),
            line: norm.line.clone(),
            direction: norm.direction.clone(),
            service: norm.service.clone(),
            time: norm.time.clone(),
            departure_actual: None,
        }
    }

    pub fn with_departure_actual(mut self, raw: &str) -> Self {
        if !raw.is_empty() {
            self.departure_actual = Some(raw.to_string());
        }
        self
    }
}

/// One reconciliation outcome: a classified pair, or an orphan from either side.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub status: MatchStatus,
    /// Canonical line for grouping/filtering (AVL side preferred).
    pub line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<Agreement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_in: Option<MatchPass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avl: Option<TripSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<TripSnapshot>,
    /// Absolute scheduled-time difference in minutes; None when either clock
    /// is unparseable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute_delta: Option<i64>,
    /// Delta known and within the configured tolerance.
    pub time_compatible: bool,
    pub notes: String,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_outcomes: usize,
    pub paired: usize,
    pub compatible: usize,
    pub time_divergent: usize,
    pub divergent: usize,
    pub avl_only: usize,
    pub roster_only: usize,
    /// round(100 · compatible / paired), 0 when nothing paired.
    pub percent_compatible: u32,
    pub distinct_lines: usize,
    pub agreement_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: RunSummary,
    pub outcomes: Vec<MatchOutcome>,
}
