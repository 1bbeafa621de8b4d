//! The reporting periods analytics can be computed over.

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{
    Error,
    calendar::{DateRange, month_bounds, year_bounds},
};

/// A preset reporting period, or custom bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyticsPeriod {
    /// The calendar month containing today.
    #[default]
    #[serde(rename = "current_month")]
    CurrentMonth,
    /// The 30 days ending today.
    #[serde(rename = "last_30_days")]
    Last30Days,
    /// The 90 days ending today.
    #[serde(rename = "last_90_days")]
    Last90Days,
    /// The calendar year containing today.
    #[serde(rename = "this_year")]
    ThisYear,
    /// Explicit `startDate` and `endDate`.
    #[serde(rename = "custom")]
    Custom,
}

/// The query parameters accepted by the analytics endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    /// The reporting period, the current month if omitted.
    pub period: Option<AnalyticsPeriod>,
    /// The first day of a custom period.
    pub start_date: Option<Date>,
    /// The last day of a custom period.
    pub end_date: Option<Date>,
}

impl AnalyticsQuery {
    /// Resolve the query to a date range relative to `today`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if a custom period is missing a bound or its start is after
    /// its end.
    pub fn resolve(&self, today: Date) -> Result<(AnalyticsPeriod, DateRange), Error> {
        let period = self.period.unwrap_or_default();

        let range = match period {
            AnalyticsPeriod::CurrentMonth => month_bounds(today),
            AnalyticsPeriod::Last30Days => trailing_days(today, 30),
            AnalyticsPeriod::Last90Days => trailing_days(today, 90),
            AnalyticsPeriod::ThisYear => year_bounds(today),
            AnalyticsPeriod::Custom => match (self.start_date, self.end_date) {
                (Some(start), Some(end)) if start <= end => DateRange { start, end },
                (Some(start), Some(end)) => {
                    return Err(Error::Validation(format!(
                        "startDate {start} is after endDate {end}"
                    )));
                }
                _ => {
                    return Err(Error::Validation(
                        "a custom period requires both startDate and endDate".to_owned(),
                    ));
                }
            },
        };

        Ok((period, range))
    }
}

/// The `days` days ending with `today`, inclusive.
pub fn trailing_days(today: Date, days: i64) -> DateRange {
    DateRange {
        start: today - Duration::days(days - 1),
        end: today,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error,
        analytics::window::{AnalyticsPeriod, AnalyticsQuery},
        calendar::DateRange,
    };

    const TODAY: time::Date = date!(2026 - 10 - 18);

    fn query(period: AnalyticsPeriod) -> AnalyticsQuery {
        AnalyticsQuery {
            period: Some(period),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_current_month() {
        let (period, range) = AnalyticsQuery::default().resolve(TODAY).unwrap();

        assert_eq!(period, AnalyticsPeriod::CurrentMonth);
        assert_eq!(
            range,
            DateRange {
                start: date!(2026 - 10 - 01),
                end: date!(2026 - 10 - 31),
            }
        );
    }

    #[test]
    fn trailing_periods_end_today() {
        let (_, range) = query(AnalyticsPeriod::Last30Days).resolve(TODAY).unwrap();
        assert_eq!(range.start, date!(2026 - 09 - 19));
        assert_eq!(range.end, TODAY);

        let (_, range) = query(AnalyticsPeriod::Last90Days).resolve(TODAY).unwrap();
        assert_eq!(range.start, date!(2026 - 07 - 21));
    }

    #[test]
    fn this_year_covers_calendar_year() {
        let (_, range) = query(AnalyticsPeriod::ThisYear).resolve(TODAY).unwrap();

        assert_eq!(range.start, date!(2026 - 01 - 01));
        assert_eq!(range.end, date!(2026 - 12 - 31));
    }

    #[test]
    fn custom_requires_ordered_bounds() {
        let missing_end = AnalyticsQuery {
            start_date: Some(date!(2026 - 01 - 01)),
            ..query(AnalyticsPeriod::Custom)
        };
        assert!(matches!(missing_end.resolve(TODAY), Err(Error::Validation(_))));

        let inverted = AnalyticsQuery {
            start_date: Some(date!(2026 - 02 - 01)),
            end_date: Some(date!(2026 - 01 - 01)),
            ..query(AnalyticsPeriod::Custom)
        };
        assert!(matches!(inverted.resolve(TODAY), Err(Error::Validation(_))));

        let valid = AnalyticsQuery {
            start_date: Some(date!(2026 - 01 - 01)),
            end_date: Some(date!(2026 - 01 - 01)),
            ..query(AnalyticsPeriod::Custom)
        };
        assert_eq!(
            valid.resolve(TODAY).unwrap().1,
            DateRange {
                start: date!(2026 - 01 - 01),
                end: date!(2026 - 01 - 01),
            }
        );
    }

    #[test]
    fn period_names_match_query_values() {
        let period: AnalyticsPeriod = serde_json::from_str("\"last_30_days\"").unwrap();

        assert_eq!(period, AnalyticsPeriod::Last30Days);
    }
}
