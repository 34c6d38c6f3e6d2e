use chrono::Utc;
use drawbook_core::search::{search, SearchResults};
use serde::Serialize;

use crate::commands::common::{
    folder_to_list_item, format_folder_lines, format_page_lines, normalize_search_query,
    page_to_list_item, AppContext, FolderListItem, PageListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub folders: Vec<FolderListItem>,
    pub pages: Vec<PageListItem>,
}

pub async fn search_names(ctx: &AppContext, query: &str) -> Result<SearchResults, CliError> {
    let query = normalize_search_query(query)?;
    Ok(search(ctx.pages.listing(), &query).await?)
}

pub async fn run_search(ctx: &AppContext, query: &str, as_json: bool) -> Result<(), CliError> {
    let results = search_names(ctx, query).await?;
    let counts = ctx.pages.folder_page_counts().await?;
    let folders = results
        .folders
        .iter()
        .map(|folder| folder_to_list_item(folder, counts.get(&folder.id).copied().unwrap_or(0)))
        .collect::<Vec<_>>();

    if as_json {
        let now_ms = Utc::now().timestamp_millis();
        let output = SearchOutput {
            folders,
            pages: results
                .pages
                .iter()
                .map(|page| page_to_list_item(page, now_ms))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matches");
        return Ok(());
    }
    for line in format_folder_lines(&folders) {
        println!("{line}");
    }
    for line in format_page_lines(&results.pages) {
        println!("{line}");
    }
    Ok(())
}
