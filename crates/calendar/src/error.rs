use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CalendarError {
    #[snafu(display("GitHub token not configured on server."))]
    MissingToken { stage: &'static str },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to GitHub failed on `{stage}`: {source}"))]
    Request {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("GitHub API responded with status {status}"))]
    UpstreamStatus { stage: &'static str, status: u16 },
    #[snafu(display("failed to decode GitHub response on `{stage}`: {source}"))]
    DecodeResponse {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("{message}"))]
    Graphql {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("No contribution calendar found in response"))]
    MissingCalendar { stage: &'static str },
}

pub type CalendarResult<T> = Result<T, CalendarError>;
