use std::path::Path;

use drawbook_core::drafts::DraftStore;
use drawbook_core::PageId;

use crate::cli::DraftCommands;
use crate::commands::common::{
    draft_to_list_item, format_draft_lines, normalize_identifier, open_local_store,
    DraftListItem,
};
use crate::error::CliError;

/// Draft commands only touch the local cache, so they work offline
pub fn run_draft(command: DraftCommands, db_path: &Path) -> Result<(), CliError> {
    let store = open_local_store(db_path)?;
    match command {
        DraftCommands::List { json } => run_draft_list(&store, json),
        DraftCommands::Discard { id } => run_draft_discard(&store, &id).map(|_| ()),
    }
}

pub fn list_draft_items(store: &dyn DraftStore) -> Result<Vec<DraftListItem>, CliError> {
    let mut drafts = store.list()?;
    drafts.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
    Ok(drafts.iter().map(|draft| draft_to_list_item(draft)).collect())
}

pub fn run_draft_list(store: &dyn DraftStore, as_json: bool) -> Result<(), CliError> {
    let items = list_draft_items(store)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No cached drafts");
    } else {
        for line in format_draft_lines(&items) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Drop a cached draft; the next load uses the server copy
pub fn run_draft_discard(store: &dyn DraftStore, id: &str) -> Result<bool, CliError> {
    let query = normalize_identifier(id).ok_or(CliError::EmptyPageId)?;
    let page_id = query
        .parse::<PageId>()
        .map_err(|_| CliError::InvalidPageId(query.clone()))?;

    let removed = store.delete(&page_id)?;
    if removed {
        println!("Discarded draft of page {page_id}");
    } else {
        println!("No cached draft for page {page_id}");
    }
    Ok(removed)
}
