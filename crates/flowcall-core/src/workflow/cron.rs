//! Five-field cron grammar used to vet schedule-trigger expressions.

use regex::Regex;
use std::sync::OnceLock;

/// Once daily at 09:00.
pub const DEFAULT_CRON: &str = "0 9 * * *";

/// Inclusive bounds for minute, hour, day-of-month, month, day-of-week.
/// Day-of-week accepts 7 as an alias for Sunday.
const FIELD_BOUNDS: [(u32, u32); 5] = [(0, 59), (0, 23), (1, 31), (1, 12), (0, 7)];

static ATOM: OnceLock<Option<Regex>> = OnceLock::new();

fn atom() -> Option<&'static Regex> {
    ATOM.get_or_init(|| Regex::new(r"^(?:(\*)|(\d+)(?:-(\d+))?)(?:/(\d+))?$").ok())
        .as_ref()
}

/// Returns `true` when `expression` is a valid 5-field cron expression.
///
/// Each field is `*`, a bounded integer, a range `a-b`, or a step (`*/n`,
/// `a/n`, `a-b/n`); comma-separated lists of those are accepted as well.
pub fn is_valid_cron(expression: &str) -> bool {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    fields.len() == FIELD_BOUNDS.len()
        && fields
            .iter()
            .zip(FIELD_BOUNDS)
            .all(|(field, bounds)| field.split(',').all(|part| is_valid_atom(part, bounds)))
}

fn is_valid_atom(part: &str, (min, max): (u32, u32)) -> bool {
    let Some(caps) = atom().and_then(|re| re.captures(part)) else {
        return false;
    };
    let number = |idx: usize| caps.get(idx).map(|m| m.as_str().parse::<u32>().ok());

    let in_bounds = |v: u32| (min..=max).contains(&v);
    let start_ok = match number(2) {
        Some(Some(start)) => in_bounds(start),
        Some(None) => false,
        None => caps.get(1).is_some(),
    };
    let range_ok = match (number(2), number(3)) {
        (Some(Some(start)), Some(Some(end))) => in_bounds(end) && start <= end,
        (_, Some(None)) => false,
        _ => true,
    };
    let step_ok = match number(4) {
        Some(Some(step)) => step >= 1 && step <= max.max(1),
        Some(None) => false,
        None => true,
    };

    start_ok && range_ok && step_ok
}
