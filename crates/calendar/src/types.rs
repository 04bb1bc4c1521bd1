use serde::{Deserialize, Serialize};

/// Public contribution calendar of one GitHub account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub total_contributions: u64,
    pub weeks: Vec<ContributionWeek>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionWeek {
    pub contribution_days: Vec<ContributionDay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDay {
    pub contribution_count: u64,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    /// Hex color GitHub assigns to the day's intensity bucket.
    pub color: String,
}

impl ContributionCalendar {
    pub fn days(&self) -> impl Iterator<Item = &ContributionDay> {
        self.weeks.iter().flat_map(|week| week.contribution_days.iter())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphqlRequest<'a> {
    pub query: &'a str,
    pub variables: GraphqlVariables<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphqlVariables<'a> {
    pub login: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<ResponseData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseData {
    #[serde(default)]
    pub user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserNode {
    #[serde(default)]
    pub contributions_collection: Option<ContributionsCollection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContributionsCollection {
    #[serde(default)]
    pub contribution_calendar: Option<ContributionCalendar>,
}

impl GraphqlResponse {
    pub(crate) fn into_calendar(self) -> Option<ContributionCalendar> {
        self.data?
            .user?
            .contributions_collection?
            .contribution_calendar
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn calendar_round_trips_github_field_names() {
        let raw = serde_json::json!({
            "totalContributions": 3,
            "weeks": [{
                "contributionDays": [
                    {"contributionCount": 1, "date": "2025-01-05", "color": "#9be9a8"},
                    {"contributionCount": 2, "date": "2025-01-06", "color": "#40c463"}
                ]
            }]
        });

        let calendar: ContributionCalendar = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(calendar.days().map(|day| day.contribution_count).sum::<u64>(), 3);
        assert_eq!(serde_json::to_value(&calendar).unwrap(), raw);
    }

    #[test]
    fn nested_nulls_yield_no_calendar() {
        let response: GraphqlResponse =
            serde_json::from_str(r#"{"data":{"user":null}}"#).unwrap();
        assert!(response.errors.is_none());
        assert!(response.into_calendar().is_none());
    }
}
