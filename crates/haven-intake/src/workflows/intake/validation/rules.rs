use chrono::NaiveDate;

use super::{ValidationContext, ValidationFinding};

/// A cross-field rule over a whole stage payload.
pub(crate) type Rule<P> = fn(&P, &ValidationContext) -> Option<ValidationFinding>;

pub(crate) fn run_rules<P>(
    payload: &P,
    context: &ValidationContext,
    rules: &[Rule<P>],
) -> Vec<ValidationFinding> {
    rules
        .iter()
        .filter_map(|rule| rule(payload, context))
        .collect()
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map(|text| text.trim().is_empty()).unwrap_or(true)
}

pub(crate) fn required_date(
    field: &str,
    label: &str,
    value: Option<NaiveDate>,
) -> Option<ValidationFinding> {
    match value {
        Some(_) => None,
        None => Some(ValidationFinding::error(field, format!("{label} is required"))),
    }
}

pub(crate) fn not_in_future(
    field: &str,
    label: &str,
    value: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<ValidationFinding> {
    match value {
        Some(date) if date > today => Some(ValidationFinding::error(
            field,
            format!("{label} ({date}) cannot be in the future"),
        )),
        _ => None,
    }
}

/// Error when `value` precedes `earlier`, a date recorded in a prior stage.
pub(crate) fn not_before(
    field: &str,
    label: &str,
    value: Option<NaiveDate>,
    earlier_label: &str,
    earlier: Option<NaiveDate>,
) -> Option<ValidationFinding> {
    match (value, earlier) {
        (Some(date), Some(bound)) if date < bound => Some(ValidationFinding::error(
            field,
            format!("{label} ({date}) cannot be before the {earlier_label} ({bound})"),
        )),
        _ => None,
    }
}

pub(crate) fn digit_count(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}
