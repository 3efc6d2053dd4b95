use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::{debug, info, warn};

use super::ClassroomApi;
use crate::config::Config;
use crate::errors::ApiError;
use crate::models::{ClassInfoPayload, ClassroomReceipt};

const SEARCH_SCHOOLS_PATH: &str = "schools/search";
const CLASSROOMS_PATH: &str = "classrooms";

/// Longest error body kept in an `ApiError::Status` message
const MAX_ERROR_BODY: usize = 200;

/// reqwest-backed client for the registration backend
#[derive(Debug, Clone)]
pub struct HttpClassroomApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpClassroomApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(config.http.user_agent.as_str())
            .timeout(config.http_timeout())
            .build()?;

        // Joining relative paths needs the base to end in '/'
        let raw = format!("{}/", config.api_base_url());
        let base_url = Url::parse(&raw).map_err(|e| ApiError::InvalidBaseUrl {
            url: config.api.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            token: config.api.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidBaseUrl {
            url: self.base_url.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn search_url(&self, keyword: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(SEARCH_SCHOOLS_PATH)?;
        url.query_pairs_mut().append_pair("keyword", keyword);
        Ok(url)
    }

    pub fn submit_url(&self) -> Result<Url, ApiError> {
        self.endpoint(CLASSROOMS_PATH)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Read the body and turn non-2xx statuses into `ApiError::Status`
    async fn read_body(response: Response) -> Result<(u16, String), ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let mut message: String = body.chars().take(MAX_ERROR_BODY).collect();
            if message.trim().is_empty() {
                message = status.canonical_reason().unwrap_or("unknown error").to_string();
            }
            return Err(ApiError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        Ok((status.as_u16(), body))
    }
}

/// Decode a search response. `null` and an empty body both mean no match.
pub fn decode_school_names(endpoint: &str, body: &str) -> Result<Vec<String>, ApiError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let names: Option<Vec<String>> =
        serde_json::from_str(body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })?;
    Ok(names.unwrap_or_default())
}

/// Decode a submission response. Non-JSON bodies are kept as plain strings.
pub fn decode_receipt(status: u16, body: &str) -> ClassroomReceipt {
    let body = if body.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
    };
    ClassroomReceipt { status, body }
}

#[async_trait]
impl ClassroomApi for HttpClassroomApi {
    async fn search_schools(&self, keyword: &str) -> Result<Vec<String>, ApiError> {
        let url = self.search_url(keyword)?;
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(url.clone())).send().await?;
        let (_, body) = Self::read_body(response).await?;
        let names = decode_school_names(url.path(), &body)?;

        debug!("School search '{}' returned {} names", keyword, names.len());
        Ok(names)
    }

    async fn submit_class_info(&self, payload: &ClassInfoPayload) -> Result<ClassroomReceipt, ApiError> {
        let url = self.submit_url()?;
        info!(
            "Submitting class info: {} grade {} class {}",
            payload.school_name, payload.grade, payload.class_number
        );

        let response = self.authorize(self.client.post(url)).json(payload).send().await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!("Class info submission did not reach the server: {}", e);
                return Err(e.into());
            }
        };

        let (status, body) = Self::read_body(response).await?;
        info!("Class info accepted (status {})", status);
        Ok(decode_receipt(status, &body))
    }
}
