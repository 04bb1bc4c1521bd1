use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChatError {
    #[snafu(display("failed to read preamble file at {path:?} on `{stage}`: {source}"))]
    ReadPreamble {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("preamble file at {path:?} is empty"))]
    EmptyPreamble {
        stage: &'static str,
        path: PathBuf,
    },
}

pub type ChatResult<T> = Result<T, ChatError>;
