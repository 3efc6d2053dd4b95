//! Remote collaborators of the class registration form
//!
//! The form only ever talks to two endpoints: a school-name search and the
//! class-info submission. Both sit behind [`ClassroomApi`] so the view-model
//! can be driven by the real HTTP client or by an in-memory fake.

pub mod http;

pub use http::HttpClassroomApi;

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::models::{ClassInfoPayload, ClassroomReceipt};

#[async_trait]
pub trait ClassroomApi: Send + Sync {
    /// Full official school names matching `keyword`. An empty list means no match.
    async fn search_schools(&self, keyword: &str) -> Result<Vec<String>, ApiError>;

    /// Persist the finished class info.
    async fn submit_class_info(&self, payload: &ClassInfoPayload) -> Result<ClassroomReceipt, ApiError>;
}
