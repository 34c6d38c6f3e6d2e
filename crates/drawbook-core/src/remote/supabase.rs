//! Supabase (PostgREST) record store.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{NewPage, RemoteError, RemoteResult, RemoteStore};
use crate::models::{Folder, FolderId, PageContent, PageId, PageRecord, PageSummary};
use crate::util::{format_rfc3339_millis, is_http_url, parse_rfc3339_millis, unix_millis_now};

const PAGE_COLUMNS: &str = "page_id,name,page_elements,updated_at,folder_id";
const SUMMARY_COLUMNS: &str = "page_id,name,updated_at,folder_id";
const FOLDER_COLUMNS: &str = "folder_id,name,icon,created_at,updated_at";

/// Remote store backed by the `pages` and `folders` PostgREST tables.
///
/// Auth flows live elsewhere: the caller hands in a user access token and
/// every request carries it next to the project's anon key.
#[derive(Clone)]
pub struct SupabaseRecordStore {
    rest_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl fmt::Debug for SupabaseRecordStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseRecordStore")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseRecordStore {
    pub fn new(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        access_token: impl Into<String>,
    ) -> RemoteResult<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Access token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            access_token,
            client: Client::builder().build()?,
        })
    }

    /// Base REST endpoint, e.g. `https://demo.supabase.co/rest/v1`
    #[must_use]
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn table(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
    }

    fn returning(&self, request: RequestBuilder) -> RequestBuilder {
        self.authorized(request)
            .header("Prefer", "return=representation")
    }

    async fn send(request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(parse_api_error(status, &body)));
        }
        Ok(response)
    }

    async fn fetch_rows<T>(request: RequestBuilder) -> RemoteResult<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = Self::send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn single_folder(&self, request: RequestBuilder, id: &FolderId) -> RemoteResult<Folder> {
        let rows = Self::fetch_rows::<FolderRow>(self.returning(request)).await?;
        first_row(rows, || id.to_string())?.try_into()
    }
}

#[async_trait]
impl RemoteStore for SupabaseRecordStore {
    async fn get_page(&self, id: &PageId) -> RemoteResult<PageRecord> {
        tracing::debug!("Fetching page {id}");
        let request = self.authorized(
            self.client
                .get(self.table("pages"))
                .query(&[("select", PAGE_COLUMNS.to_string()), ("page_id", eq(id))]),
        );
        let rows = Self::fetch_rows::<PageRow>(request).await?;
        first_row(rows, || id.to_string())?.try_into()
    }

    async fn set_page(&self, id: &PageId, content: &PageContent, name: &str) -> RemoteResult<i64> {
        let payload = PageWrite {
            name: Some(name),
            page_elements: Some(PageElements {
                elements: content.elements(),
            }),
            updated_at: format_rfc3339_millis(unix_millis_now()),
            user_id: None,
            folder_id: None,
        };
        let request = self.returning(
            self.client
                .patch(self.table("pages"))
                .query(&[("page_id", eq(id)), ("select", SUMMARY_COLUMNS.to_string())])
                .json(&payload),
        );
        let rows = Self::fetch_rows::<PageSummaryRow>(request).await?;
        let summary: PageSummary = first_row(rows, || id.to_string())?.try_into()?;
        tracing::debug!("Saved page {id} at {}", summary.updated_at);
        Ok(summary.updated_at)
    }

    async fn create_page(&self, owner_id: &str, page: NewPage) -> RemoteResult<PageRecord> {
        let folder_id = page.folder_id.map(|id| id.to_string());
        let payload = PageInsert {
            page_id: PageId::new().to_string(),
            write: PageWrite {
                name: Some(&page.name),
                page_elements: Some(PageElements {
                    elements: page.content.elements(),
                }),
                updated_at: format_rfc3339_millis(unix_millis_now()),
                user_id: Some(owner_id),
                folder_id: folder_id.as_deref(),
            },
        };
        let request = self.returning(
            self.client
                .post(self.table("pages"))
                .query(&[("select", PAGE_COLUMNS)])
                .json(&payload),
        );
        let rows = Self::fetch_rows::<PageRow>(request).await?;
        first_row(rows, || payload.page_id.clone())?.try_into()
    }

    async fn delete_page(&self, id: &PageId) -> RemoteResult<()> {
        let request = self.returning(
            self.client
                .delete(self.table("pages"))
                .query(&[("page_id", eq(id)), ("select", "page_id".to_string())]),
        );
        let rows = Self::fetch_rows::<Value>(request).await?;
        first_row(rows, || id.to_string()).map(|_| ())
    }

    async fn list_pages(&self, owner_id: &str) -> RemoteResult<Vec<PageSummary>> {
        let request = self.authorized(self.client.get(self.table("pages")).query(&[
            ("select", SUMMARY_COLUMNS.to_string()),
            ("user_id", format!("eq.{owner_id}")),
            ("order", "updated_at.desc".to_string()),
        ]));
        Self::fetch_rows::<PageSummaryRow>(request)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn list_folders(&self, owner_id: &str) -> RemoteResult<Vec<Folder>> {
        let request = self.authorized(self.client.get(self.table("folders")).query(&[
            ("select", FOLDER_COLUMNS.to_string()),
            ("user_id", format!("eq.{owner_id}")),
            ("order", "created_at.asc".to_string()),
        ]));
        Self::fetch_rows::<FolderRow>(request)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn create_folder(&self, owner_id: &str, name: &str, icon: &str) -> RemoteResult<Folder> {
        let id = FolderId::new();
        let now = format_rfc3339_millis(unix_millis_now());
        let payload = serde_json::json!({
            "folder_id": id.to_string(),
            "name": name,
            "icon": icon,
            "user_id": owner_id,
            "created_at": now,
            "updated_at": now,
        });
        let request = self
            .client
            .post(self.table("folders"))
            .query(&[("select", FOLDER_COLUMNS)])
            .json(&payload);
        self.single_folder(request, &id).await
    }

    async fn rename_folder(&self, id: &FolderId, name: &str) -> RemoteResult<Folder> {
        let payload = serde_json::json!({
            "name": name,
            "updated_at": format_rfc3339_millis(unix_millis_now()),
        });
        let request = self
            .client
            .patch(self.table("folders"))
            .query(&[("folder_id", eq(id)), ("select", FOLDER_COLUMNS.to_string())])
            .json(&payload);
        self.single_folder(request, id).await
    }

    async fn set_folder_icon(&self, id: &FolderId, icon: &str) -> RemoteResult<Folder> {
        let payload = serde_json::json!({
            "icon": icon,
            "updated_at": format_rfc3339_millis(unix_millis_now()),
        });
        let request = self
            .client
            .patch(self.table("folders"))
            .query(&[("folder_id", eq(id)), ("select", FOLDER_COLUMNS.to_string())])
            .json(&payload);
        self.single_folder(request, id).await
    }

    async fn delete_folder(&self, id: &FolderId) -> RemoteResult<()> {
        // Unfile pages first so the folder row is never referenced after removal.
        let unfile = self.authorized(
            self.client
                .patch(self.table("pages"))
                .query(&[("folder_id", eq(id))])
                .json(&serde_json::json!({ "folder_id": Value::Null })),
        );
        Self::send(unfile).await?;

        let request = self.returning(
            self.client
                .delete(self.table("folders"))
                .query(&[("folder_id", eq(id)), ("select", "folder_id".to_string())]),
        );
        let rows = Self::fetch_rows::<Value>(request).await?;
        first_row(rows, || id.to_string()).map(|_| ())
    }
}

/// Normalize a project URL into its PostgREST base (`.../rest/v1`).
pub fn normalize_rest_url(url: &str) -> RemoteResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(trimmed) {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

fn eq(id: &impl fmt::Display) -> String {
    format!("eq.{id}")
}

fn first_row<T>(rows: Vec<T>, id: impl FnOnce() -> String) -> RemoteResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| RemoteError::NotFound(id()))
}

fn parse_timestamp(field: &str, value: &str) -> RemoteResult<i64> {
    parse_rfc3339_millis(value).ok_or_else(|| {
        RemoteError::InvalidPayload(format!("{field} is not an RFC 3339 timestamp: {value}"))
    })
}

fn parse_page_id(value: &str) -> RemoteResult<PageId> {
    value
        .parse()
        .map_err(|_| RemoteError::InvalidPayload(format!("invalid page id: {value}")))
}

fn parse_folder_id(value: Option<&str>) -> RemoteResult<Option<FolderId>> {
    value
        .map(|raw| {
            raw.parse()
                .map_err(|_| RemoteError::InvalidPayload(format!("invalid folder id: {raw}")))
        })
        .transpose()
}

#[derive(Debug, Serialize)]
struct PageElements<'a> {
    elements: &'a [Value],
}

#[derive(Debug, Serialize)]
struct PageWrite<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_elements: Option<PageElements<'a>>,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PageInsert<'a> {
    page_id: String,
    #[serde(flatten)]
    write: PageWrite<'a>,
}

#[derive(Debug, Default, Deserialize)]
struct PageElementsRow {
    #[serde(default)]
    elements: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PageRow {
    page_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    page_elements: Option<PageElementsRow>,
    updated_at: String,
    #[serde(default)]
    folder_id: Option<String>,
}

impl TryFrom<PageRow> for PageRecord {
    type Error = RemoteError;

    fn try_from(row: PageRow) -> RemoteResult<Self> {
        Ok(Self {
            id: parse_page_id(&row.page_id)?,
            name: row.name.unwrap_or_default(),
            content: PageContent::new(row.page_elements.unwrap_or_default().elements),
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            folder_id: parse_folder_id(row.folder_id.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PageSummaryRow {
    page_id: String,
    #[serde(default)]
    name: Option<String>,
    updated_at: String,
    #[serde(default)]
    folder_id: Option<String>,
}

impl TryFrom<PageSummaryRow> for PageSummary {
    type Error = RemoteError;

    fn try_from(row: PageSummaryRow) -> RemoteResult<Self> {
        Ok(Self {
            id: parse_page_id(&row.page_id)?,
            name: row.name.unwrap_or_default(),
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            folder_id: parse_folder_id(row.folder_id.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FolderRow {
    folder_id: String,
    name: String,
    #[serde(default)]
    icon: Option<String>,
    created_at: String,
    #[serde(default)]
    updated_at: Option<String>,
}

impl TryFrom<FolderRow> for Folder {
    type Error = RemoteError;

    fn try_from(row: FolderRow) -> RemoteResult<Self> {
        let created_at = parse_timestamp("created_at", &row.created_at)?;
        let updated_at = match row.updated_at.as_deref() {
            Some(value) => parse_timestamp("updated_at", value)?,
            None => created_at,
        };
        Ok(Self {
            id: parse_folder_id(Some(&row.folder_id))?
                .ok_or_else(|| RemoteError::InvalidPayload("missing folder id".to_string()))?,
            name: row.name,
            icon: row.icon.unwrap_or_default(),
            created_at,
            updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            let detail = payload
                .details
                .or(payload.hint)
                .filter(|detail| !detail.trim().is_empty());
            return match detail {
                Some(detail) => format!(
                    "{} ({}): {}",
                    message.trim(),
                    status.as_u16(),
                    detail.trim()
                ),
                None => format!("{} ({})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed = crate::util::compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
