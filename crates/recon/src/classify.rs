//! Field-by-field agreement classification of two normalized trips.
//!
//! The 16 classes enumerate every equality pattern over
//! (line, direction, service, time). Classification is a table lookup keyed
//! by the 4-bit inequality pattern, so no fallback branch exists to reach.

use serde::Serialize;

use crate::model::{MatchStatus, NormalizedTrip};

/// Agreement class for a compared pair, best agreement first.
/// The discriminant order doubles as the tie-break ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    AllEqual,
    TimeOnlyDiffers,
    ServiceOnlyDiffers,
    ServiceAndTimeDiffer,
    DirectionOnlyDiffers,
    DirectionAndTimeDiffer,
    DirectionAndServiceDiffer,
    OnlyLineEqual,
    LineOnlyDiffers,
    LineAndTimeDiffer,
    LineAndServiceDiffer,
    OnlyDirectionEqual,
    LineAndDirectionDiffer,
    OnlyServiceEqual,
    OnlyTimeEqual,
    AllDiffer,
}

/// Lookup table indexed by the inequality pattern
/// `(line≠)<<3 | (direction≠)<<2 | (service≠)<<1 | (time≠)`.
const AGREEMENT_TABLE: [Agreement; 16] = [
    Agreement::AllEqual,                  // 0b0000
    Agreement::TimeOnlyDiffers,           // 0b0001
    Agreement::ServiceOnlyDiffers,        // 0b0010
    Agreement::ServiceAndTimeDiffer,      // 0b0011
    Agreement::DirectionOnlyDiffers,      // 0b0100
    Agreement::DirectionAndTimeDiffer,    // 0b0101
    Agreement::DirectionAndServiceDiffer, // 0b0110
    Agreement::OnlyLineEqual,             // 0b0111
    Agreement::LineOnlyDiffers,           // 0b1000
    Agreement::LineAndTimeDiffer,         // 0b1001
    Agreement::LineAndServiceDiffer,      // 0b1010
    Agreement::OnlyDirectionEqual,        // 0b1011
    Agreement::LineAndDirectionDiffer,    // 0b1100
    Agreement::OnlyServiceEqual,          // 0b1101
    Agreement::OnlyTimeEqual,             // 0b1110
    Agreement::AllDiffer,                 // 0b1111
];

/// Classify two normalized trips by plain string equality per field.
pub fn classify(a: &NormalizedTrip, b: &NormalizedTrip) -> Agreement {
    let mut pattern = 0usize;
    if a.line != b.line {
        pattern |= 0b1000;
    }
    if a.direction != b.direction {
        pattern |= 0b0100;
    }
    if a.service != b.service {
        pattern |= 0b0010;
    }
    if a.time != b.time {
        pattern |= 0b0001;
    }
    AGREEMENT_TABLE[pattern]
}

impl Agreement {
    /// 1-based priority rank; 1 = full agreement, 16 = full disagreement.
    /// Total ordering for tie-breaks and for scoring cost functions.
    pub fn rank(self) -> u8 {
        self as u8 + 1
    }

    /// Verdict a paired outcome gets from this class alone.
    pub fn status(self) -> MatchStatus {
        match self {
            Self::AllEqual => MatchStatus::Compatible,
            Self::TimeOnlyDiffers => MatchStatus::TimeDivergent,
            _ => MatchStatus::Divergent,
        }
    }

    /// Human phrase for review notes.
    pub fn describe(self) -> &'static str {
        match self {
            Self::AllEqual => "agrees on line, direction, service and time",
            Self::TimeOnlyDiffers => "only the scheduled time differs",
            Self::ServiceOnlyDiffers => "only the service number differs",
            Self::ServiceAndTimeDiffer => "service and time differ",
            Self::DirectionOnlyDiffers => "only the direction differs",
            Self::DirectionAndTimeDiffer => "direction and time differ",
            Self::DirectionAndServiceDiffer => "direction and service differ",
            Self::OnlyLineEqual => "only the line agrees",
            Self::LineOnlyDiffers => "only the line differs",
            Self::LineAndTimeDiffer => "line and time differ",
            Self::LineAndServiceDiffer => "line and service differ",
            Self::OnlyDirectionEqual => "only the direction agrees",
            Self::LineAndDirectionDiffer => "line and direction differ",
            Self::OnlyServiceEqual => "only the service number agrees",
            Self::OnlyTimeEqual => "only the scheduled time agrees",
            Self::AllDiffer => "disagrees on every field",
        }
    }
}

impl std::fmt::Display for Agreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Matches the serde snake_case names so summary map keys and JSON agree.
        let name = match self {
            Self::AllEqual => "all_equal",
            Self::TimeOnlyDiffers => "time_only_differs",
            Self::ServiceOnlyDiffers => "service_only_differs",
            Self::ServiceAndTimeDiffer => "service_and_time_differ",
            Self::DirectionOnlyDiffers => "direction_only_differs",
            Self::DirectionAndTimeDiffer => "direction_and_time_differ",
            Self::DirectionAndServiceDiffer => "direction_and_service_differ",
            Self::OnlyLineEqual => "only_line_equal",
            Self::LineOnlyDiffers => "line_only_differs",
            Self::LineAndTimeDiffer => "line_and_time_differ",
            Self::LineAndServiceDiffer => "line_and_service_differ",
            Self::OnlyDirectionEqual => "only_direction_equal",
            Self::LineAndDirectionDiffer => "line_and_direction_differ",
            Self::OnlyServiceEqual => "only_service_equal",
            Self::OnlyTimeEqual => "only_time_equal",
            Self::AllDiffer => "all_differ",
        };
        write!(f, "{name}")
    }
}
