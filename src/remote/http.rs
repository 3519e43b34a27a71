//! HTTP remote source
//!
//! Drives a JSON list endpoint: one GET per page, sync and page tokens as
//! query parameters, and the page read from configurable response fields.

use super::source::RemoteSource;
use super::types::{Item, ItemStatus, ListRequest, Page};
use crate::config::{QueryParamNames, RemoteConfig, ResponseFields};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::template::{self, TemplateContext};
use crate::types::{JsonValue, OptionStringExt};
use async_trait::async_trait;
use chrono::SecondsFormat;
use tracing::debug;

/// Remote source backed by an HTTP list endpoint
#[derive(Debug)]
pub struct HttpRemoteSource {
    client: HttpClient,
    /// Rendered list endpoint path
    path: String,
    /// Rendered static query parameters, sorted by name
    params: Vec<(String, String)>,
    page_size: Option<u32>,
    query: QueryParamNames,
    fields: ResponseFields,
    invalidation_statuses: Vec<u16>,
}

impl HttpRemoteSource {
    /// Build the client and the source from config
    pub fn from_config(config: &RemoteConfig, context: &TemplateContext) -> Result<Self> {
        let headers = template::render_map(&config.headers, context)?;
        let client = HttpClient::with_config(config.http.client_config(&config.base_url, headers))?;
        Self::new(client, config, context)
    }

    /// Use an existing client; base URL and headers come from the client
    pub fn new(client: HttpClient, config: &RemoteConfig, context: &TemplateContext) -> Result<Self> {
        let path = template::render(&config.path, context)?;
        let mut params: Vec<_> = template::render_map(&config.params, context)?
            .into_iter()
            .collect();
        params.sort();

        Ok(Self {
            client,
            path,
            params,
            page_size: config.page_size,
            query: config.query.clone(),
            fields: config.fields.clone(),
            invalidation_statuses: config.invalidation_statuses.clone(),
        })
    }

    /// Rendered endpoint path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query for one `list` call
    pub fn request_config(&self, request: &ListRequest) -> RequestConfig {
        let mut config = RequestConfig::new();
        for (key, value) in &self.params {
            config = config.query(key, value);
        }
        if let Some(size) = self.page_size {
            config = config.query(&self.query.page_size, size.to_string());
        }
        if let Some(ref checkpoint) = request.checkpoint {
            config = config.query(&self.query.checkpoint, checkpoint);
        }
        if let Some(bound) = request.lower_bound {
            config = config.query(
                &self.query.lower_bound,
                bound.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
        if let Some(ref cursor) = request.page_cursor {
            config = config.query(&self.query.page_cursor, cursor);
        }
        config
    }

    /// Read a page from a response body
    pub fn parse_page(&self, body: &JsonValue) -> Result<Page> {
        let object = body
            .as_object()
            .ok_or_else(|| Error::protocol("list response is not a JSON object"))?;

        let items = match object.get(&self.fields.items) {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(values)) => values
                .iter()
                .map(|value| self.parse_item(value))
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(Error::protocol(format!(
                    "'{}' is not an array",
                    self.fields.items
                )))
            }
        };

        Ok(Page {
            items,
            next_cursor: string_field(body, &self.fields.next_cursor),
            checkpoint: string_field(body, &self.fields.checkpoint),
        })
    }

    fn parse_item(&self, value: &JsonValue) -> Result<Item> {
        let id = string_field(value, &self.fields.id).ok_or_else(|| {
            Error::protocol(format!("item without a '{}' field", self.fields.id))
        })?;

        let tombstoned = value
            .get(&self.fields.status)
            .and_then(JsonValue::as_str)
            .is_some_and(|status| status == self.fields.tombstone_value);

        Ok(Item {
            id,
            status: if tombstoned {
                ItemStatus::Tombstoned
            } else {
                ItemStatus::Active
            },
            payload: serde_json::to_string(value)?,
        })
    }

    /// Map a transport failure onto the remote source taxonomy
    fn classify(&self, error: Error) -> Error {
        match error {
            Error::HttpStatus { status, body } if self.invalidation_statuses.contains(&status) => {
                Error::checkpoint_invalid(format!("HTTP {status}: {body}"))
            }
            error if error.is_retryable() => Error::transient(error.to_string()),
            error => error,
        }
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn list(&self, request: &ListRequest) -> Result<Page> {
        let config = self.request_config(request);
        let body: JsonValue = self
            .client
            .get_json(&self.path, config)
            .await
            .map_err(|e| self.classify(e))?;

        let page = self.parse_page(&body)?;
        debug!(
            "Fetched {} items from {} (more pages: {})",
            page.items.len(),
            self.path,
            !page.is_last()
        );
        Ok(page)
    }
}

/// Non-empty string at `field`
fn string_field(value: &JsonValue, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .none_if_empty()
}
