//! Connection settings and query rendering

use epictree_core::DEFAULT_BATCH_LIMIT;

use crate::error::AzdoError;

/// REST API version sent with every request
pub const DEFAULT_API_VERSION: &str = "4.1-preview";

/// HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Epic -> feature -> story tree query. `{0}` is the project, `{1}` the area path.
pub const DEFAULT_WORK_ITEMS_QUERY: &str = "SELECT [System.Id], [System.WorkItemType], [System.Title] \
FROM WorkItemLinks \
WHERE ([Source].[System.TeamProject] = '{0}' \
AND [Source].[System.AreaPath] UNDER '{1}' \
AND [Source].[System.WorkItemType] = 'Epic' \
AND [Source].[System.State] <> 'Removed') \
AND ([System.Links.LinkType] = 'System.LinkTypes.Hierarchy-Forward') \
AND ([Target].[System.WorkItemType] IN ('Feature', 'User Story') \
AND [Target].[System.State] <> 'Removed') \
ORDER BY [System.Id] MODE (Recursive)";

/// Settings of the Azure DevOps client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzdoConfig {
    /// Organization name or full service URL
    pub account: String,
    pub project: String,
    pub personal_access_token: String,
    /// Area path to restrict the query to; the project when unset
    pub area_path: Option<String>,
    /// WIQL template; the built-in tree query when unset
    pub work_items_query: Option<String>,
    pub api_version: String,
    pub timeout_secs: u64,
    /// Largest id list accepted by a single lookup
    pub max_ids_per_request: usize,
}

impl Default for AzdoConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            project: String::new(),
            personal_access_token: String::new(),
            area_path: None,
            work_items_query: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_ids_per_request: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl AzdoConfig {
    /// Config with credentials and defaults otherwise
    pub fn new(
        account: impl Into<String>,
        project: impl Into<String>,
        personal_access_token: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            project: project.into(),
            personal_access_token: personal_access_token.into(),
            ..Self::default()
        }
    }

    /// Service root: the account itself when it is already a URL, otherwise
    /// the hosted organization address.
    pub fn base_url(&self) -> String {
        let account = self.account.trim();
        if account.to_ascii_lowercase().contains(".com") {
            account.trim_end_matches('/').to_string()
        } else {
            format!("https://{}.visualstudio.com", account)
        }
    }

    /// Area path used by the query, falling back to the project
    pub fn effective_area_path(&self) -> &str {
        match self.area_path.as_deref().map(str::trim) {
            Some(area) if !area.is_empty() => area,
            _ => &self.project,
        }
    }

    /// WIQL text with project and area path filled in
    pub fn render_query(&self) -> String {
        let template = match self.work_items_query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => query,
            _ => DEFAULT_WORK_ITEMS_QUERY,
        };
        template
            .replace("{0}", &escape_literal(&self.project))
            .replace("{1}", &escape_literal(self.effective_area_path()))
    }

    /// Check that everything needed to reach the backend is present
    pub fn validate(&self) -> Result<(), AzdoError> {
        let mut missing = Vec::new();
        if self.account.trim().is_empty() {
            missing.push("AZDO_ACCOUNT");
        }
        if self.project.trim().is_empty() {
            missing.push("AZDO_PROJECT");
        }
        if self.personal_access_token.trim().is_empty() {
            missing.push("AZDO_PERSONAL_ACCESS_TOKEN");
        }
        if !missing.is_empty() {
            return Err(AzdoError::MissingSettings(missing));
        }

        if self.max_ids_per_request == 0 {
            return Err(AzdoError::InvalidSetting {
                name: "max_ids_per_request",
                reason: "must be positive".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(AzdoError::InvalidSetting {
                name: "AZDO_TIMEOUT_SECS",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Quote doubling for WIQL string literals
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
