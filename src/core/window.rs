use chrono::NaiveDate;

use super::dates::parse_date;

/// Upcoming harvests shown on the dashboard.
pub const HARVEST_WINDOW: usize = 2;
/// Upcoming tasks shown on the dashboard.
pub const TASK_WINDOW: usize = 3;

/// Select items dated on or after `reference`, nearest first, at most `limit`.
///
/// Items whose date is missing or unparsable are dropped. The sort is
/// stable, so items sharing a date keep their input order.
pub fn select_upcoming<T, F>(
    items: impl IntoIterator<Item = T>,
    date_of: F,
    reference: NaiveDate,
    limit: usize,
) -> Vec<T>
where
    F: Fn(&T) -> Option<&str>,
{
    select_upcoming_dated(items, date_of, reference, limit)
        .into_iter()
        .map(|(_, item)| item)
        .collect()
}

/// Same as [`select_upcoming`] but keeps the parsed date next to each item.
pub fn select_upcoming_dated<T, F>(
    items: impl IntoIterator<Item = T>,
    date_of: F,
    reference: NaiveDate,
    limit: usize,
) -> Vec<(NaiveDate, T)>
where
    F: Fn(&T) -> Option<&str>,
{
    let mut upcoming: Vec<(NaiveDate, T)> = items
        .into_iter()
        .filter_map(|item| {
            let date = date_of(&item).and_then(parse_date)?;
            (date >= reference).then_some((date, item))
        })
        .collect();

    upcoming.sort_by_key(|(date, _)| *date);
    upcoming.truncate(limit);
    upcoming
}
