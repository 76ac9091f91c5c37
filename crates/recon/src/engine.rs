use crate::aggregate::summarize;
use crate::claim::ClaimTracker;
use crate::config::{AvlColumns, ReconConfig, RosterColumns, ToleranceConfig};
use crate::error::ReconError;
use crate::matcher::{run_passes, PairHit};
use crate::model::{
    AvlTrip, MatchOutcome, MatchPass, MatchStatus, NormalizedTrip, ReconInput, ReconMeta,
    ReconResult, RosterTrip, TripSnapshot,
};
use crate::normalize::{normalize_avl, normalize_roster};

/// Run one reconciliation over pre-loaded collections.
///
/// Pure and infallible: all I/O and config fallibility live with the caller.
/// Every input record lands in exactly one outcome, paired or orphan.
pub fn run(config: &ReconConfig, input: &ReconInput) -> ReconResult {
    let avl_norm: Vec<NormalizedTrip> = input.avl.iter().map(normalize_avl).collect();
    let roster_norm: Vec<NormalizedTrip> = input.roster.iter().map(normalize_roster).collect();

    let mut claims = ClaimTracker::new(input.avl.len(), input.roster.len());
    let hits = run_passes(&avl_norm, &roster_norm, &config.tolerance, &mut claims);

    let mut outcomes = Vec::with_capacity(input.avl.len() + input.roster.len());
    for hit in &hits {
        outcomes.push(paired_outcome(hit, input, &avl_norm, &roster_norm, &config.tolerance));
    }
    for i in claims.unclaimed_avl() {
        outcomes.push(avl_orphan(&input.avl[i], &avl_norm[i]));
    }
    for j in claims.unclaimed_roster() {
        outcomes.push(roster_orphan(&input.roster[j], &roster_norm[j]));
    }

    let summary = summarize(&outcomes);

    ReconResult {
        meta: ReconMeta {
            name: config.name.clone(),
            reference_date: config.reference_date.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        outcomes,
    }
}

fn paired_outcome(
    hit: &PairHit,
    input: &ReconInput,
    avl_norm: &[NormalizedTrip],
    roster_norm: &[NormalizedTrip],
    tolerance: &ToleranceConfig,
) -> MatchOutcome {
    let a = &avl_norm[hit.avl];
    let b = &roster_norm[hit.roster];

    let time_compatible = hit
        .minute_delta
        .is_some_and(|d| d <= tolerance.time_equal_min);

    let line = if !a.line.is_empty() {
        a.line.clone()
    } else {
        b.line.clone()
    };

    // Notes describe the tuples the pass actually compared: strict for the
    // exact passes, relaxed for the late ones.
    let (ca, cb) = match hit.pass {
        MatchPass::ExactFirstFit | MatchPass::KeyedNearestTime => (a.clone(), b.clone()),
        _ => (a.relaxed(), b.relaxed()),
    };
    let notes = paired_notes(hit, &ca, &cb);

    MatchOutcome {
        status: hit.agreement.status(),
        line,
        agreement: Some(hit.agreement),
        matched_in: Some(hit.pass),
        avl: Some(
            TripSnapshot::new(&input.avl[hit.avl].id, a)
                .with_departure_actual(&input.avl[hit.avl].departure_actual),
        ),
        roster: Some(TripSnapshot::new(&input.roster[hit.roster].id, b)),
        minute_delta: hit.minute_delta,
        time_compatible,
        notes,
    }
}

fn paired_notes(hit: &PairHit, a: &NormalizedTrip, b: &NormalizedTrip) -> String {
    let mut notes = Vec::new();

    if a.line != b.line {
        notes.push(format!("line differs: {} vs {}", a.line, b.line));
    }
    if a.direction != b.direction {
        notes.push(format!("direction differs: {} vs {}", a.direction, b.direction));
    }
    if a.service != b.service {
        notes.push(format!("service differs: {} vs {}", a.service, b.service));
    }
    if a.time != b.time {
        match hit.minute_delta {
            Some(d) => notes.push(format!("time differs by {d} min ({} vs {})", a.time, b.time)),
            None => notes.push(format!("time differs ({} vs {})", a.time, b.time)),
        }
    }

    if notes.is_empty() {
        hit.agreement.describe().to_string()
    } else {
        notes.join("; ")
    }
}

fn avl_orphan(raw: &AvlTrip, norm: &NormalizedTrip) -> MatchOutcome {
    MatchOutcome {
        status: MatchStatus::AvlOnly,
        line: norm.line.clone(),
        agreement: None,
        matched_in: None,
        avl: Some(TripSnapshot::new(&raw.id, norm).with_departure_actual(&raw.departure_actual)),
        roster: None,
        minute_delta: None,
        time_compatible: false,
        notes: "found only in the AVL feed".to_string(),
    }
}

fn roster_orphan(raw: &RosterTrip, norm: &NormalizedTrip) -> MatchOutcome {
    let notes = if raw.sector.is_empty() {
        "found only in the roster".to_string()
    } else {
        format!("found only in the roster (sector {})", raw.sector)
    };
    MatchOutcome {
        status: MatchStatus::RosterOnly,
        line: norm.line.clone(),
        agreement: None,
        matched_in: None,
        avl: None,
        roster: Some(TripSnapshot::new(&raw.id, norm)),
        minute_delta: None,
        time_compatible: false,
        notes,
    }
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

fn header_index(headers: &[String], source: &str, name: &str) -> Result<usize, ReconError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ReconError::MissingColumn {
            source: source.into(),
            column: name.into(),
        })
}

/// Load AVL trips from CSV text, mapping columns by header name.
/// Missing cells degrade to empty strings; missing headers are errors.
pub fn load_avl_rows(csv_data: &str, columns: &AvlColumns) -> Result<Vec<AvlTrip>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let id_idx = header_index(&headers, "avl", &columns.id)?;
    let line_idx = header_index(&headers, "avl", &columns.line_name)?;
    let direction_idx = header_index(&headers, "avl", &columns.direction)?;
    let service_idx = header_index(&headers, "avl", &columns.service)?;
    let departure_idx = header_index(&headers, "avl", &columns.departure)?;
    let actual_idx = match &columns.departure_actual {
        Some(name) => Some(header_index(&headers, "avl", name)?),
        None => None,
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();

        rows.push(AvlTrip {
            id: cell(id_idx),
            line_name: cell(line_idx),
            direction: cell(direction_idx),
            service: cell(service_idx),
            departure: cell(departure_idx),
            departure_actual: actual_idx.map(cell).unwrap_or_default(),
        });
    }

    Ok(rows)
}

/// Load roster trips from CSV text, mapping columns by header name.
pub fn load_roster_rows(
    csv_data: &str,
    columns: &RosterColumns,
) -> Result<Vec<RosterTrip>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let id_idx = header_index(&headers, "roster", &columns.id)?;
    let line_idx = header_index(&headers, "roster", &columns.line_code)?;
    let line_name_idx = match &columns.line_name {
        Some(name) => Some(header_index(&headers, "roster", name)?),
        None => None,
    };
    let direction_idx = header_index(&headers, "roster", &columns.direction_flag)?;
    let service_idx = header_index(&headers, "roster", &columns.service_code)?;
    let departure_idx = header_index(&headers, "roster", &columns.departure)?;
    let sector_idx = match &columns.sector {
        Some(name) => Some(header_index(&headers, "roster", name)?),
        None => None,
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();

        rows.push(RosterTrip {
            id: cell(id_idx),
            line_code: cell(line_idx),
            line_name: line_name_idx.map(cell).unwrap_or_default(),
            direction_flag: cell(direction_idx),
            service_code: cell(service_idx),
            departure: cell(departure_idx),
            sector: sector_idx.map(cell).unwrap_or_default(),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Agreement;

    fn config() -> ReconConfig {
        ReconConfig::from_toml(
            r#"
name = "Engine Test"
reference_date = "2025-10-26"

[sources.avl]
file = "avl.csv"
[sources.avl.columns]
id = "id"
line_name = "line"
direction = "direction"
service = "service"
departure = "departure"

[sources.roster]
file = "roster.csv"
[sources.roster.columns]
id = "id"
line_code = "line"
direction_flag = "direction"
service_code = "service"
departure = "departure"
"#,
        )
        .unwrap()
    }

    fn avl(id: &str, line: &str, direction: &str, service: &str, departure: &str) -> AvlTrip {
        AvlTrip {
            id: id.into(),
            line_name: line.into(),
            direction: direction.into(),
            service: service.into(),
            departure: departure.into(),
            departure_actual: String::new(),
        }
    }

    fn roster(id: &str, line: &str, flag: &str, service: &str, departure: &str) -> RosterTrip {
        RosterTrip {
            id: id.into(),
            line_code: line.into(),
            line_name: String::new(),
            direction_flag: flag.into(),
            service_code: service.into(),
            departure: departure.into(),
            sector: String::new(),
        }
    }

    #[test]
    fn incompatible_records_orphan_on_both_sides() {
        // Different lines in every pass and different services: no pass
        // may join them.
        let input = ReconInput {
            avl: vec![avl("a1", "100.2 - Somewhere", "IDA", "3", "15:40:00")],
            roster: vec![roster("g1", "0026", "C", "01", "15:40:00")],
        };
        let result = run(&config(), &input);
        assert_eq!(result.summary.paired, 0);
        assert_eq!(result.summary.avl_only, 1);
        assert_eq!(result.summary.roster_only, 1);
    }

    #[test]
    fn two_minute_offset_is_time_divergent_but_time_compatible() {
        let input = ReconInput {
            avl: vec![avl("a1", "67 - Plano Piloto", "IDA", "3", "26/10/2025 15:40:00")],
            roster: vec![roster("g1", "0067", "I", "03", "15:42:00")],
        };
        let result = run(&config(), &input);
        assert_eq!(result.summary.paired, 1);
        let o = &result.outcomes[0];
        assert_eq!(o.status, MatchStatus::TimeDivergent);
        assert_eq!(o.agreement, Some(Agreement::TimeOnlyDiffers));
        assert_eq!(o.minute_delta, Some(2));
        assert!(o.time_compatible);
        assert!(o.notes.contains("time differs by 2 min"));
    }

    #[test]
    fn empty_roster_orphans_every_avl_record() {
        let input = ReconInput {
            avl: (0..10)
                .map(|i| avl(&format!("a{i}"), "10", "IDA", "1", "08:00"))
                .collect(),
            roster: vec![],
        };
        let result = run(&config(), &input);
        assert_eq!(result.summary.paired, 0);
        assert_eq!(result.summary.avl_only, 10);
        assert_eq!(result.summary.roster_only, 0);
        assert_eq!(result.summary.percent_compatible, 0);
    }

    #[test]
    fn meta_carries_config_identity() {
        let result = run(&config(), &ReconInput::default());
        assert_eq!(result.meta.name, "Engine Test");
        assert_eq!(result.meta.reference_date.as_deref(), Some("2025-10-26"));
        assert!(!result.meta.engine_version.is_empty());
    }

    #[test]
    fn load_avl_csv_basic() {
        let csv = "\
id,line,direction,service,departure
1,100.2 - Paranoá,IDA,3,26/10/2025 15:40:00
2,67 - W3 Sul,VOLTA,8,
";
        let cols = config().sources.avl.columns.clone();
        let rows = load_avl_rows(csv, &cols).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[0].service, "3");
        assert_eq!(rows[1].departure, "");
    }

    #[test]
    fn load_roster_csv_missing_column() {
        let csv = "id,line,direction\n1,0026,C\n";
        let cols = config().sources.roster.columns.clone();
        let err = load_roster_rows(csv, &cols).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { .. }));
        assert!(err.to_string().contains("service"));
    }

    #[test]
    fn load_roster_csv_with_optional_sector() {
        let csv = "\
id,line,direction,service,departure,SETOR
g1,0026,C,01,06:07:01,GAMA
";
        let mut cols = config().sources.roster.columns.clone();
        cols.sector = Some("SETOR".into());
        let rows = load_roster_rows(csv, &cols).unwrap();
        assert_eq!(rows[0].sector, "GAMA");
    }
}
