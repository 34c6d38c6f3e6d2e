use drawbook_core::Folder;

use crate::cli::FolderCommands;
use crate::commands::common::{
    folder_to_list_item, format_folder_lines, join_name, resolve_folder, AppContext,
    FolderListItem,
};
use crate::error::CliError;

pub async fn run_folder(command: FolderCommands, ctx: &AppContext) -> Result<(), CliError> {
    match command {
        FolderCommands::List { json } => run_folder_list(ctx, json).await,
        FolderCommands::New { name, icon } => {
            run_folder_new(ctx, &name, &icon).await.map(|_| ())
        }
        FolderCommands::Rename { id, name } => {
            run_folder_rename(ctx, &id, &name).await.map(|_| ())
        }
        FolderCommands::Icon { id, icon } => run_folder_icon(ctx, &id, &icon).await.map(|_| ()),
        FolderCommands::Delete { id } => run_folder_delete(ctx, &id).await,
    }
}

pub async fn list_folder_items(ctx: &AppContext) -> Result<Vec<FolderListItem>, CliError> {
    let folders = ctx.folders.list().await?;
    let counts = ctx.pages.folder_page_counts().await?;
    Ok(folders
        .iter()
        .map(|folder| folder_to_list_item(folder, counts.get(&folder.id).copied().unwrap_or(0)))
        .collect())
}

pub async fn run_folder_list(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let items = list_folder_items(ctx).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No folders");
    } else {
        for line in format_folder_lines(&items) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_folder_new(
    ctx: &AppContext,
    name_parts: &[String],
    icon: &str,
) -> Result<Folder, CliError> {
    let folder = ctx.folders.create(&join_name(name_parts), icon).await?;
    println!("Created folder {} ({})", folder.id, folder.name);
    Ok(folder)
}

pub async fn run_folder_rename(
    ctx: &AppContext,
    id: &str,
    name_parts: &[String],
) -> Result<Folder, CliError> {
    let folder = resolve_folder(id, &ctx.folders).await?;
    match ctx.folders.rename(&folder, &join_name(name_parts)).await? {
        Some(renamed) => {
            println!("Renamed folder {} to {}", renamed.id, renamed.name);
            Ok(renamed)
        }
        None => {
            println!("Folder {} already has that name", folder.id);
            Ok(folder)
        }
    }
}

pub async fn run_folder_icon(ctx: &AppContext, id: &str, icon: &str) -> Result<Folder, CliError> {
    let folder = resolve_folder(id, &ctx.folders).await?;
    let updated = ctx.folders.set_icon(&folder.id, icon).await?;
    if updated.icon.is_empty() {
        println!("Cleared icon of folder {}", updated.id);
    } else {
        println!("Set icon of folder {} to {}", updated.id, updated.icon);
    }
    Ok(updated)
}

pub async fn run_folder_delete(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let folder = resolve_folder(id, &ctx.folders).await?;
    ctx.folders.delete(&folder.id).await?;
    println!("Deleted folder {} ({}); its pages are now unfiled", folder.id, folder.name);
    Ok(())
}
