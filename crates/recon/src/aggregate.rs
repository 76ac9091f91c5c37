use std::collections::{HashMap, HashSet};

use crate::model::{MatchOutcome, MatchStatus, RunSummary};

/// Compute summary statistics from the final outcome list.
pub fn summarize(outcomes: &[MatchOutcome]) -> RunSummary {
    let mut agreement_counts: HashMap<String, usize> = HashMap::new();
    let mut lines: HashSet<&str> = HashSet::new();
    let mut compatible = 0;
    let mut time_divergent = 0;
    let mut divergent = 0;
    let mut avl_only = 0;
    let mut roster_only = 0;

    for o in outcomes {
        if !o.line.is_empty() {
            lines.insert(o.line.as_str());
        }
        if let Some(agreement) = o.agreement {
            *agreement_counts.entry(agreement.to_string()).or_insert(0) += 1;
        }

        match o.status {
            MatchStatus::Compatible => compatible += 1,
            MatchStatus::TimeDivergent => time_divergent += 1,
            MatchStatus::Divergent => divergent += 1,
            MatchStatus::AvlOnly => avl_only += 1,
            MatchStatus::RosterOnly => roster_only += 1,
        }
    }

    let paired = compatible + time_divergent + divergent;
    let percent_compatible = if paired > 0 {
        ((100.0 * compatible as f64) / paired as f64).round() as u32
    } else {
        0
    };

    RunSummary {
        total_outcomes: outcomes.len(),
        paired,
        compatible,
        time_divergent,
        divergent,
        avl_only,
        roster_only,
        percent_compatible,
        distinct_lines: lines.len(),
        agreement_counts,
    }
}
