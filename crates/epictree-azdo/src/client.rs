//! HTTP client for the work-item tracking API

use std::time::Duration;

use async_trait::async_trait;
use epictree_core::{Edge, EdgeSource, FetchError, FetchResult, NodeId, RawRecord, RecordFetcher};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::AzdoConfig;
use crate::error::AzdoError;

/// Client for the Azure DevOps work-item endpoints
#[derive(Debug, Clone)]
pub struct AzdoClient {
    config: AzdoConfig,
    base_url: String,
    client: Client,
}

/// Request payload for a WIQL query
#[derive(Debug, Serialize)]
struct WiqlRequest<'a> {
    query: &'a str,
}

/// Response of a link (tree) query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlRelationList {
    #[serde(default)]
    work_item_relations: Option<Vec<RelationDto>>,
}

#[derive(Debug, Deserialize)]
struct RelationDto {
    #[serde(default)]
    source: Option<WorkItemRef>,
    #[serde(default)]
    target: Option<WorkItemRef>,
    #[serde(default)]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkItemRef {
    id: u32,
}

/// Response of a batched work-item lookup
#[derive(Debug, Deserialize)]
struct WorkItemsResponse {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    value: Vec<WorkItemDto>,
}

#[derive(Debug, Deserialize)]
struct WorkItemDto {
    id: u32,
    #[serde(default)]
    fields: WorkItemFields,
}

#[derive(Debug, Default, Deserialize)]
struct WorkItemFields {
    #[serde(rename = "System.Title", default)]
    title: String,
    #[serde(rename = "System.Description", default)]
    description: Option<String>,
    #[serde(rename = "System.WorkItemType", default)]
    work_item_type: Option<String>,
    #[serde(rename = "Microsoft.VSTS.Common.AcceptanceCriteria", default)]
    acceptance_criteria: Option<String>,
    #[serde(rename = "System.Tags", default)]
    tags: Option<String>,
}

/// Error body returned by the service on failures
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<WorkItemDto> for RawRecord {
    fn from(dto: WorkItemDto) -> Self {
        let fields = dto.fields;
        RawRecord {
            id: NodeId(dto.id),
            title: fields.title,
            description: fields.description,
            work_item_type: fields.work_item_type.map(Into::into).unwrap_or_default(),
            acceptance_criteria: fields.acceptance_criteria,
            tags: fields.tags,
        }
    }
}

impl RelationDto {
    fn into_edge(self) -> FetchResult<Edge> {
        let target = self.target.ok_or_else(|| {
            FetchError::MalformedEdgeList(format!(
                "relation {:?} from {:?} has no target",
                self.rel,
                self.source.as_ref().map(|s| s.id)
            ))
        })?;
        Ok(Edge {
            source: self.source.map(|s| NodeId(s.id)),
            target: NodeId(target.id),
        })
    }
}

impl AzdoClient {
    /// Creates a client for the configured account
    pub fn new(config: AzdoConfig) -> Result<Self, AzdoError> {
        let base_url = config.base_url();
        Self::with_base_url(config, base_url)
    }

    /// Creates a client talking to an explicit service root
    pub fn with_base_url(config: AzdoConfig, base_url: impl Into<String>) -> Result<Self, AzdoError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    pub fn config(&self) -> &AzdoConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}/_apis/{}", self.base_url, self.config.project, path)
    }

    /// Maps an HTTP error to a FetchError
    fn map_http_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else if error.is_decode() {
            FetchError::Decode(error.to_string())
        } else {
            FetchError::Transport(error.to_string())
        }
    }

    /// Decode a successful response or turn a failed one into a status error
    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> FetchResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_http_error(e))?;

        if !status.is_success() {
            let reason = failure_reason(status, &body);
            warn!(status = status.as_u16(), "Backend rejected request: {}", reason);
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

fn failure_reason(status: StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        return error.message;
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP error: {}", status))
}

#[async_trait]
impl EdgeSource for AzdoClient {
    #[instrument(skip(self), fields(project = %self.config.project))]
    async fn fetch_edges(&self) -> FetchResult<Vec<Edge>> {
        let query = self.config.render_query();
        debug!("Running relation query: {}", query);

        let response = self
            .client
            .post(self.api_url("wit/wiql"))
            .query(&[("api-version", self.config.api_version.as_str())])
            .basic_auth("", Some(&self.config.personal_access_token))
            .json(&WiqlRequest { query: &query })
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?;

        let list: WiqlRelationList = self.read_json(response).await?;
        let relations = list.work_item_relations.ok_or_else(|| {
            FetchError::MalformedEdgeList("response has no workItemRelations".to_string())
        })?;

        let edges = relations
            .into_iter()
            .map(RelationDto::into_edge)
            .collect::<FetchResult<Vec<_>>>()?;
        debug!(edges = edges.len(), "Relation query returned");
        Ok(edges)
    }
}

#[async_trait]
impl RecordFetcher for AzdoClient {
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    async fn fetch(&self, ids: &[NodeId]) -> FetchResult<Vec<RawRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let max = self.config.max_ids_per_request;
        if ids.len() > max {
            return Err(FetchError::ChunkTooLarge { len: ids.len(), max });
        }

        let id_list = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        let response = self
            .client
            .get(self.api_url("wit/workitems"))
            .query(&[("ids", id_list.as_str()), ("api-version", self.config.api_version.as_str())])
            .basic_auth("", Some(&self.config.personal_access_token))
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?;

        let items: WorkItemsResponse = self.read_json(response).await?;
        debug!(requested = ids.len(), count = items.count, "Fetched work items");
        Ok(items.value.into_iter().map(RawRecord::from).collect())
    }
}
