//! Field normalization: raw source records → comparable [`NormalizedTrip`]s.
//!
//! Every function here is pure and total — malformed or missing fields
//! degrade to empty strings or pass-through text, never to an error.

use crate::model::{AvlTrip, NormalizedTrip, RosterTrip};

/// Line codes are capped at this many digits on both sources.
const LINE_DIGIT_CAP: usize = 6;

/// Roster duty numbers are zero-padded to this width at the source.
const SERVICE_PAD_WIDTH: usize = 2;

/// Collapse raw direction codes to the fixed IDA/VOLTA vocabulary.
/// Unrecognized values pass through trimmed and uppercased.
fn map_direction(raw: &str) -> String {
    let up = raw.trim().to_uppercase();
    match up.as_str() {
        "C" | "I" | "IDA" => "IDA".to_string(),
        "V" | "VOLTA" => "VOLTA".to_string(),
        _ => up,
    }
}

/// Digits of the leading numeric pattern of an AVL line label:
/// "100.2 - Paranoá / Plano Piloto" → "1002".
fn leading_line_digits(name: &str) -> String {
    name.trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .filter(|c| c.is_ascii_digit())
        .take(LINE_DIGIT_CAP)
        .collect()
}

/// All digits of a roster line code: "026-A" → "026".
fn digits_only(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_digit())
        .take(LINE_DIGIT_CAP)
        .collect()
}

/// Extract "HH:MM" from a clock string, with or without a date prefix:
/// "26/10/2025 15:40:00" → "15:40", "06:07:01" → "06:07", "" → "".
fn clock_part(raw: &str) -> String {
    let trimmed = raw.trim();
    let clock = match trimmed.rsplit_once(' ') {
        Some((_, tail)) => tail,
        None => trimmed,
    };
    clock.chars().take(5).collect()
}

/// Pad a roster duty number to the source's fixed width: "1" → "01".
fn pad_service(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.is_empty() || trimmed.len() >= SERVICE_PAD_WIDTH {
        return trimmed.to_string();
    }
    format!("{:0>width$}", trimmed, width = SERVICE_PAD_WIDTH)
}

/// Strip leading zeros, keeping a single "0" for all-zero input.
pub fn strip_leading_zeros(s: &str) -> &str {
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() && !s.is_empty() {
        "0"
    } else {
        stripped
    }
}

/// Parse "HH:MM" into minutes since midnight. None means incomparable.
pub fn parse_minutes(hhmm: &str) -> Option<i32> {
    let (h, m) = hhmm.split_once(':')?;
    let h: i32 = h.trim().parse().ok()?;
    let m: i32 = m.trim().parse().ok()?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return None;
    }
    Some(h * 60 + m)
}

pub fn normalize_avl(trip: &AvlTrip) -> NormalizedTrip {
    NormalizedTrip {
        line: leading_line_digits(&trip.line_name),
        direction: map_direction(&trip.direction),
        service: trip.service.trim().to_string(),
        time: clock_part(&trip.departure),
    }
}

pub fn normalize_roster(trip: &RosterTrip) -> NormalizedTrip {
    NormalizedTrip {
        line: digits_only(&trip.line_code),
        direction: map_direction(&trip.direction_flag),
        service: pad_service(&trip.service_code),
        time: clock_part(&trip.departure),
    }
}

impl NormalizedTrip {
    /// Relaxed comparison view: leading zeros stripped from line and service
    /// so "026"/"26" and "03"/"3" compare equal in the late passes.
    pub fn relaxed(&self) -> NormalizedTrip {
        NormalizedTrip {
            line: strip_leading_zeros(&self.line).to_string(),
            direction: self.direction.clone(),
            service: strip_leading_zeros(&self.service).to_string(),
            time: self.time.clone(),
        }
    }

    /// Minutes since midnight of `time`, None when unparseable.
    pub fn minutes(&self) -> Option<i32> {
        parse_minutes(&self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avl(line_name: &str, direction: &str, service: &str, departure: &str) -> AvlTrip {
        AvlTrip {
            id: "a1".into(),
            line_name: line_name.into(),
            direction: direction.into(),
            service: service.into(),
            departure: departure.into(),
            departure_actual: String::new(),
        }
    }

    fn roster(line_code: &str, flag: &str, service: &str, departure: &str) -> RosterTrip {
        RosterTrip {
            id: "g1".into(),
            line_code: line_code.into(),
            line_name: String::new(),
            direction_flag: flag.into(),
            service_code: service.into(),
            departure: departure.into(),
            sector: String::new(),
        }
    }

    #[test]
    fn avl_line_leading_pattern() {
        let n = normalize_avl(&avl(
            "100.2 - Paranoá (Paranoá Parque) / Rod. Plano Piloto (L2 Sul)",
            "IDA",
            "3",
            "26/10/2025 15:40:00",
        ));
        assert_eq!(n.line, "1002");
        assert_eq!(n.direction, "IDA");
        assert_eq!(n.service, "3");
        assert_eq!(n.time, "15:40");
    }

    #[test]
    fn avl_line_ignores_digits_past_the_leading_pattern() {
        // The "(L2 Sul)" digit must not leak into the line code.
        let n = normalize_avl(&avl("67 - W3 Sul (L2 Sul)", "VOLTA", "8", "15:40:00"));
        assert_eq!(n.line, "67");
        assert_eq!(n.time, "15:40");
    }

    #[test]
    fn roster_line_strips_non_digits() {
        let n = normalize_roster(&roster("0026", "C", "01", "01/01/1900 06:07:01"));
        assert_eq!(n.line, "0026");
        assert_eq!(n.direction, "IDA"); // circular flag collapses to IDA
        assert_eq!(n.service, "01");
        assert_eq!(n.time, "06:07");
    }

    #[test]
    fn direction_vocabulary() {
        assert_eq!(map_direction("i"), "IDA");
        assert_eq!(map_direction("V"), "VOLTA");
        assert_eq!(map_direction(" volta "), "VOLTA");
        assert_eq!(map_direction("circular norte"), "CIRCULAR NORTE");
        assert_eq!(map_direction(""), "");
    }

    #[test]
    fn service_padding_is_roster_only() {
        assert_eq!(normalize_roster(&roster("1", "I", "1", "")).service, "01");
        assert_eq!(normalize_roster(&roster("1", "I", "10", "")).service, "10");
        assert_eq!(normalize_avl(&avl("1", "I", "3", "")).service, "3");
    }

    #[test]
    fn missing_fields_degrade_to_empty() {
        let n = normalize_avl(&AvlTrip { id: "a".into(), ..Default::default() });
        assert_eq!(n.line, "");
        assert_eq!(n.direction, "");
        assert_eq!(n.service, "");
        assert_eq!(n.time, "");
    }

    #[test]
    fn clock_part_shapes() {
        assert_eq!(clock_part("26/10/2025 15:40:00"), "15:40");
        assert_eq!(clock_part("15:40:00"), "15:40");
        assert_eq!(clock_part("15:40"), "15:40");
        assert_eq!(clock_part(""), "");
        assert_eq!(clock_part("whenever"), "whene");
    }

    #[test]
    fn parse_minutes_rejects_garbage() {
        assert_eq!(parse_minutes("15:40"), Some(15 * 60 + 40));
        assert_eq!(parse_minutes("00:00"), Some(0));
        assert_eq!(parse_minutes("whene"), None);
        assert_eq!(parse_minutes("25:00"), None);
        assert_eq!(parse_minutes("12:75"), None);
        assert_eq!(parse_minutes(""), None);
    }

    #[test]
    fn relaxed_view_strips_zeros() {
        let n = NormalizedTrip {
            line: "026".into(),
            direction: "IDA".into(),
            service: "03".into(),
            time: "10:00".into(),
        };
        let r = n.relaxed();
        assert_eq!(r.line, "26");
        assert_eq!(r.service, "3");
        assert_eq!(strip_leading_zeros("000"), "0");
        assert_eq!(strip_leading_zeros(""), "");
    }

    #[test]
    fn normalization_is_pure() {
        let t = avl("100.2 - Somewhere", "ida", "3", "26/10/2025 15:40:00");
        assert_eq!(normalize_avl(&t), normalize_avl(&t));
    }
}
