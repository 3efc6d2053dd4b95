//! Error types for the class registration client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error (status {status_code}): {message}")]
    Status {
        status_code: u16,
        message: String,
    },

    #[error("Failed to parse response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Form fields that must be filled before submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    School,
    Grade,
    ClassNumber,
}

impl RequiredField {
    pub fn as_str(&self) -> &str {
        match self {
            RequiredField::School => "school",
            RequiredField::Grade => "grade",
            RequiredField::ClassNumber => "class",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("please fill in school, grade, and class")]
pub struct ValidationError {
    pub missing: Vec<RequiredField>,
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not register the class: {0}")]
    Remote(#[from] ApiError),

    #[error("no submission is pending")]
    NothingPending,
}
