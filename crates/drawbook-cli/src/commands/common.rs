use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use drawbook_core::config::{AutosaveConfig, RemoteConfig};
use drawbook_core::diagram::{DiagramConverter, JsonElementsConverter};
use drawbook_core::drafts::DraftStore;
use drawbook_core::folders::FolderService;
use drawbook_core::invalidation::InvalidationBus;
use drawbook_core::models::display_page_name;
use drawbook_core::pages::PageService;
use drawbook_core::remote::RemoteStore;
use drawbook_core::services::LocalStore;
use drawbook_core::util::{format_rfc3339_millis, normalize_text_option};
use drawbook_core::{Folder, FolderId, LocalDraft, PageContent, PageId, PageSummary, Reconciler};
use serde::Serialize;

use crate::config_profiles::{CliProfile, ProfilesFile};
use crate::error::CliError;

const SHORT_ID_LEN: usize = 13;

/// Everything a remote-backed command needs
pub struct AppContext {
    pub reconciler: Reconciler,
    pub pages: PageService,
    pub folders: FolderService,
    pub store: LocalStore,
    pub autosave: AutosaveConfig,
}

impl AppContext {
    pub fn new(
        owner_id: &str,
        remote: Arc<dyn RemoteStore>,
        store: LocalStore,
        autosave: AutosaveConfig,
    ) -> Self {
        let drafts: Arc<dyn DraftStore> = Arc::new(store.clone());
        let reconciler = Reconciler::new(remote, drafts, InvalidationBus::new());
        let pages = PageService::new(owner_id, &reconciler);
        let folders = FolderService::new(
            owner_id,
            Arc::clone(reconciler.remote()),
            reconciler.bus().clone(),
        )
        .with_cache(store.clone());
        Self {
            reconciler,
            pages,
            folders,
            store,
            autosave,
        }
    }
}

/// Remote settings resolved from a profile plus environment overrides
#[derive(Debug)]
pub struct RemoteSettings {
    pub remote: RemoteConfig,
    pub owner_id: String,
    pub autosave: AutosaveConfig,
}

pub fn resolve_remote_settings(
    profile: &CliProfile,
    access_token: Option<String>,
    user_id_override: Option<String>,
) -> Result<RemoteSettings, CliError> {
    let remote = RemoteConfig::resolve(
        profile.supabase_url(),
        profile.supabase_anon_key(),
        normalize_text_option(access_token),
    )
    .map_err(CliError::Config)?
    .ok_or(CliError::RemoteNotConfigured)?;

    let owner_id = normalize_text_option(user_id_override)
        .or_else(|| profile.user_id())
        .ok_or_else(|| {
            CliError::Config(
                "No user id configured. Use `drawbook config init --user-id` or DRAWBOOK_USER_ID."
                    .to_string(),
            )
        })?;

    let autosave =
        AutosaveConfig::from_millis(profile.autosave_interval_ms).map_err(CliError::Config)?;

    Ok(RemoteSettings {
        remote,
        owner_id,
        autosave,
    })
}

pub fn open_context(db_path: &Path, profile_name: Option<&str>) -> Result<AppContext, CliError> {
    let config = ProfilesFile::load()?;
    let profile_name = config.resolve_profile_name(profile_name);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let settings = resolve_remote_settings(
        &profile,
        env::var("DRAWBOOK_ACCESS_TOKEN").ok(),
        env::var("DRAWBOOK_USER_ID").ok(),
    )?;
    let remote = settings.remote.connect().map_err(drawbook_core::Error::from)?;
    tracing::debug!("Using profile {profile_name} against {}", remote.rest_url());

    let store = open_local_store(db_path)?;
    Ok(AppContext::new(
        &settings.owner_id,
        Arc::new(remote),
        store,
        settings.autosave,
    ))
}

pub fn open_local_store(path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(path.to_path_buf())?)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("DRAWBOOK_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("drawbook").join("drafts.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

/// Resolve a full page id or a unique prefix of one from the listing
pub async fn resolve_page_id(query: &str, pages: &PageService) -> Result<PageId, CliError> {
    let query = normalize_identifier(query).ok_or(CliError::EmptyPageId)?;
    if let Ok(page_id) = query.parse::<PageId>() {
        return Ok(page_id);
    }

    let candidates = pages
        .listing()
        .pages()
        .await?
        .into_iter()
        .map(|page| page.id.to_string())
        .filter(|id| id.starts_with(&query))
        .collect::<Vec<_>>();
    let id = pick_unique_prefix_match(&query, candidates)?
        .ok_or_else(|| CliError::InvalidPageId(query.clone()))?;
    id.parse::<PageId>()
        .map_err(|_| CliError::InvalidPageId(query))
}

/// Find a folder by full id or unique id prefix
pub async fn resolve_folder(query: &str, folders: &FolderService) -> Result<Folder, CliError> {
    let query = normalize_identifier(query)
        .ok_or_else(|| CliError::InvalidFolderId(query.to_string()))?;
    let listed = folders.list().await?;

    if let Ok(folder_id) = query.parse::<FolderId>() {
        return listed
            .into_iter()
            .find(|folder| folder.id == folder_id)
            .ok_or(CliError::FolderNotFound(query));
    }

    let candidates = listed
        .iter()
        .map(|folder| folder.id.to_string())
        .filter(|id| id.starts_with(&query))
        .collect::<Vec<_>>();
    let id = pick_unique_prefix_match(&query, candidates)?
        .ok_or_else(|| CliError::FolderNotFound(query.clone()))?;
    listed
        .into_iter()
        .find(|folder| folder.id.to_string() == id)
        .ok_or(CliError::FolderNotFound(query))
}

pub fn pick_unique_prefix_match(
    query: &str,
    candidates: Vec<String>,
) -> Result<Option<String>, CliError> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.into_iter().next()),
        _ => {
            let options = candidates
                .iter()
                .take(3)
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_identifier(id: &str) -> Option<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptySearchQuery);
    }
    Ok(trimmed.to_string())
}

pub fn join_name(parts: &[String]) -> String {
    parts.join(" ").trim().to_string()
}

/// Read Excalidraw JSON from a file, or stdin when the path is `-`
pub fn read_scene_source(path: &Path) -> Result<String, CliError> {
    if path == Path::new("-") {
        let mut stdin = io::stdin();
        if stdin.is_terminal() {
            return Err(CliError::MissingSceneFile("-".to_string()));
        }
        let mut raw = String::new();
        stdin.read_to_string(&mut raw)?;
        return Ok(raw);
    }

    if !path.exists() {
        return Err(CliError::MissingSceneFile(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Parse scene or element-array JSON into page content
pub fn parse_scene(raw: &str) -> Result<PageContent, CliError> {
    let elements = JsonElementsConverter
        .convert(raw)
        .map_err(|error| drawbook_core::Error::Diagram(error.to_string()))?;
    Ok(PageContent::new(elements))
}

#[derive(Debug, Serialize)]
pub struct PageListItem {
    pub id: String,
    pub name: String,
    pub folder_id: Option<String>,
    pub updated_at: i64,
    pub updated_at_iso: String,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct FolderListItem {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub page_count: usize,
    pub updated_at: i64,
}

#[derive(Debug, Serialize)]
pub struct DraftListItem {
    pub page_id: String,
    pub name: String,
    pub element_count: usize,
    pub updated_at: i64,
    pub updated_at_iso: String,
}

pub fn page_to_list_item(page: &PageSummary, now_ms: i64) -> PageListItem {
    PageListItem {
        id: page.id.to_string(),
        name: display_page_name(&page.name),
        folder_id: page.folder_id.map(|id| id.to_string()),
        updated_at: page.updated_at,
        updated_at_iso: format_timestamp(page.updated_at),
        relative_time: format_relative_time(page.updated_at, now_ms),
    }
}

pub fn folder_to_list_item(folder: &Folder, page_count: usize) -> FolderListItem {
    FolderListItem {
        id: folder.id.to_string(),
        name: folder.name.clone(),
        icon: folder.icon.clone(),
        page_count,
        updated_at: folder.updated_at,
    }
}

pub fn draft_to_list_item(draft: &LocalDraft) -> DraftListItem {
    DraftListItem {
        page_id: draft.page_id.to_string(),
        name: display_page_name(&draft.name),
        element_count: draft.content.visible_len(),
        updated_at: draft.updated_at,
        updated_at_iso: format_timestamp(draft.updated_at),
    }
}

pub fn format_page_lines(pages: &[PageSummary]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    pages
        .iter()
        .map(|page| {
            format!(
                "{}  {}  ({})",
                short_id(&page.id.to_string()),
                display_page_name(&page.name),
                format_relative_time(page.updated_at, now_ms)
            )
        })
        .collect()
}

pub fn format_folder_lines(items: &[FolderListItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let label = if item.icon.is_empty() {
                item.name.clone()
            } else {
                format!("{} {}", item.icon, item.name)
            };
            let noun = if item.page_count == 1 { "page" } else { "pages" };
            format!(
                "{}  {}  [{} {}]",
                short_id(&item.id),
                label,
                item.page_count,
                noun
            )
        })
        .collect()
}

pub fn format_draft_lines(drafts: &[DraftListItem]) -> Vec<String> {
    drafts
        .iter()
        .map(|draft| {
            format!(
                "{}  {}  {} elements  {}",
                short_id(&draft.page_id),
                draft.name,
                draft.element_count,
                draft.updated_at_iso
            )
        })
        .collect()
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    format_rfc3339_millis(timestamp_ms)
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
