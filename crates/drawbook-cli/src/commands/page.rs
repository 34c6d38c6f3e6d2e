use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use drawbook_core::autosave::{spawn_autosave, AutosaveEvent};
use drawbook_core::config::AutosaveConfig;
use drawbook_core::diagram::JsonElementsConverter;
use drawbook_core::export::{
    render_markdown_index, render_page_export, render_scene_file, suggested_export_file_name,
};
use drawbook_core::models::display_page_name;
use drawbook_core::pages::FolderFilter;
use drawbook_core::{CaptureOutcome, LoadedPage, PageContent, PageRecord, RefreshOutcome};
use serde::Serialize;
use serde_json::Value;

use crate::cli::{ExportFormat, PageCommands};
use crate::commands::common::{
    format_page_lines, format_timestamp, join_name, page_to_list_item, parse_scene,
    read_scene_source, resolve_folder, resolve_page_id, short_id, AppContext, PageListItem,
};
use crate::commands::scene_file::SceneFileSource;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PageShowItem {
    pub id: String,
    pub name: String,
    pub source: String,
    pub remote_updated_at: i64,
    pub local_updated_at: Option<i64>,
    pub elements: Vec<Value>,
}

impl From<LoadedPage> for PageShowItem {
    fn from(loaded: LoadedPage) -> Self {
        Self {
            id: loaded.page_id.to_string(),
            name: loaded.name,
            source: loaded.source.as_str().to_string(),
            remote_updated_at: loaded.remote_updated_at,
            local_updated_at: loaded.local_updated_at,
            elements: loaded.content.into_elements(),
        }
    }
}

pub async fn run_page(command: PageCommands, ctx: &AppContext) -> Result<(), CliError> {
    match command {
        PageCommands::List {
            folder,
            unfiled,
            json,
        } => run_page_list(ctx, folder.as_deref(), unfiled, json).await,
        PageCommands::Show { id, json } => run_page_show(ctx, &id, json).await,
        PageCommands::New { name, folder, from } => {
            run_page_new(ctx, &name, folder.as_deref(), from.as_deref())
                .await
                .map(|_| ())
        }
        PageCommands::Save { id, file, name } => {
            run_page_save(ctx, &id, &file, name).await.map(|_| ())
        }
        PageCommands::Refresh { id, yes, output } => {
            run_page_refresh(ctx, &id, yes, output.as_deref())
                .await
                .map(|_| ())
        }
        PageCommands::Delete { id } => run_page_delete(ctx, &id).await,
        PageCommands::Export { id, format, output } => {
            run_page_export(ctx, &id, format, output.as_deref()).await
        }
        PageCommands::Index { output } => run_page_index(ctx, output.as_deref()).await,
        PageCommands::Watch {
            id,
            file,
            name,
            interval_ms,
        } => run_page_watch(ctx, &id, file, name, interval_ms).await,
    }
}

pub async fn run_page_list(
    ctx: &AppContext,
    folder: Option<&str>,
    unfiled: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let filter = if unfiled {
        FolderFilter::Unfiled
    } else if let Some(query) = folder {
        FolderFilter::Folder(resolve_folder(query, &ctx.folders).await?.id)
    } else {
        FolderFilter::All
    };
    let pages = ctx.pages.list_pages(filter).await?;

    if as_json {
        let now_ms = Utc::now().timestamp_millis();
        let items = pages
            .iter()
            .map(|page| page_to_list_item(page, now_ms))
            .collect::<Vec<PageListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if pages.is_empty() {
        println!("No pages");
    } else {
        for line in format_page_lines(&pages) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_page_show(ctx: &AppContext, id: &str, as_json: bool) -> Result<(), CliError> {
    let page_id = resolve_page_id(id, &ctx.pages).await?;
    let session = ctx.reconciler.open(page_id);
    let loaded = session.load_initial_state().await?;
    session.unmount();

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&PageShowItem::from(loaded))?
        );
        return Ok(());
    }

    println!("{}  {}", short_id(&page_id.to_string()), display_page_name(&loaded.name));
    println!("  loaded from: {}", loaded.source.as_str());
    println!("  elements:    {}", loaded.content.visible_len());
    println!(
        "  server:      {}",
        format_timestamp(loaded.remote_updated_at)
    );
    match loaded.local_updated_at {
        Some(local) => println!("  local draft: {}", format_timestamp(local)),
        None => println!("  local draft: none"),
    }
    Ok(())
}

pub async fn run_page_new(
    ctx: &AppContext,
    name_parts: &[String],
    folder: Option<&str>,
    from: Option<&Path>,
) -> Result<PageRecord, CliError> {
    let name = join_name(name_parts);
    let folder_id = match folder {
        Some(query) => Some(resolve_folder(query, &ctx.folders).await?.id),
        None => None,
    };

    let record = match from {
        Some(path) => {
            let source = read_scene_source(path)?;
            ctx.pages
                .create_from_diagram(&JsonElementsConverter, &source, &name, folder_id)
                .await?
        }
        None => {
            ctx.pages
                .create_page(&name, folder_id, PageContent::empty())
                .await?
        }
    };

    println!("Created page {} ({})", record.id, record.name);
    Ok(record)
}

pub async fn run_page_save(
    ctx: &AppContext,
    id: &str,
    file: &Path,
    name: Option<String>,
) -> Result<CaptureOutcome, CliError> {
    let page_id = resolve_page_id(id, &ctx.pages).await?;
    let content = parse_scene(&read_scene_source(file)?)?;

    let session = ctx.reconciler.open(page_id);
    let loaded = session.load_initial_state().await?;
    let name = name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or(loaded.name);

    let outcome = session.capture_and_persist(content, &name).await;
    session.unmount();
    let outcome = outcome?;

    match outcome {
        CaptureOutcome::Saved {
            remote_updated_at, ..
        } => println!(
            "Saved page {} at {}",
            short_id(&page_id.to_string()),
            format_timestamp(remote_updated_at)
        ),
        CaptureOutcome::Unchanged => println!("No changes since the last capture"),
        CaptureOutcome::Skipped | CaptureOutcome::Detached => {
            println!("Save skipped");
        }
    }
    Ok(outcome)
}

pub async fn run_page_refresh(
    ctx: &AppContext,
    id: &str,
    discard_newer_local: bool,
    output: Option<&Path>,
) -> Result<LoadedPage, CliError> {
    let page_id = resolve_page_id(id, &ctx.pages).await?;
    let session = ctx.reconciler.open(page_id);
    let outcome = session.manual_refresh(discard_newer_local).await;
    session.unmount();

    let loaded = match outcome? {
        RefreshOutcome::Refreshed(loaded) => loaded,
        RefreshOutcome::ConfirmationRequired {
            local_updated_at,
            remote_updated_at,
        } => {
            return Err(CliError::RefreshNeedsConfirmation {
                local: format_timestamp(local_updated_at),
                remote: format_timestamp(remote_updated_at),
            })
        }
        RefreshOutcome::Busy => return Err(CliError::PageBusy),
    };

    if let Some(path) = output {
        std::fs::write(path, render_scene_file(&loaded.content)?)?;
        println!("{}", path.display());
    }
    println!(
        "Refreshed page {} from the server ({} elements)",
        short_id(&page_id.to_string()),
        loaded.content.visible_len()
    );
    Ok(loaded)
}

pub async fn run_page_delete(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let page_id = resolve_page_id(id, &ctx.pages).await?;
    ctx.pages.delete_page(&page_id).await?;
    println!("Deleted page {page_id}");
    Ok(())
}

/// Export whichever copy the editor would load, so unsent drafts are included
pub async fn run_page_export(
    ctx: &AppContext,
    id: &str,
    format: ExportFormat,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let page_id = resolve_page_id(id, &ctx.pages).await?;
    let session = ctx.reconciler.open(page_id);
    let loaded = session.load_initial_state().await;
    session.unmount();
    let loaded = loaded?;

    let format = format.into();
    let payload = render_page_export(&loaded.content, format)?;

    let output_path = output_path.map(|path| {
        if path.is_dir() {
            path.join(suggested_export_file_name(&loaded.name, format))
        } else {
            path.to_path_buf()
        }
    });
    write_output(&payload, output_path.as_deref())
}

fn write_output(payload: &str, output_path: Option<&Path>) -> Result<(), CliError> {
    if let Some(path) = output_path {
        std::fs::write(path, payload)?;
        println!("{}", path.display());
    } else {
        let mut stdout = io::stdout();
        stdout.write_all(payload.as_bytes())?;
        if !payload.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

pub async fn run_page_index(ctx: &AppContext, output_path: Option<&Path>) -> Result<(), CliError> {
    let folders = ctx.folders.list().await?;
    let pages = ctx.pages.list_pages(FolderFilter::All).await?;
    write_output(&render_markdown_index(&folders, &pages), output_path)
}

pub async fn run_page_watch(
    ctx: &AppContext,
    id: &str,
    file: PathBuf,
    name: Option<String>,
    interval_ms: Option<u64>,
) -> Result<(), CliError> {
    let page_id = resolve_page_id(id, &ctx.pages).await?;
    let config = match interval_ms {
        Some(interval_ms) => {
            AutosaveConfig::from_millis(Some(interval_ms)).map_err(CliError::Config)?
        }
        None => ctx.autosave,
    };

    let session = ctx.reconciler.open(page_id);
    let loaded = session.load_initial_state().await?;
    if seed_watch_file(&loaded, &file)? {
        println!("Wrote {} copy to {}", loaded.source.as_str(), file.display());
    }

    let name = name.unwrap_or_else(|| loaded.name.clone());
    let source = SceneFileSource::new(file, name);
    println!(
        "Watching {} every {} ms. Press Ctrl-C to stop.",
        source.path().display(),
        config.interval.as_millis()
    );

    let mut handle = spawn_autosave(session, source, config);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = handle.next_event() => match event {
                Some(event) => report_autosave_event(&event),
                None => break,
            },
        }
    }

    for event in handle.stop().await {
        report_autosave_event(&event);
    }
    Ok(())
}

/// Write the loaded content to `path` unless a file is already there
pub fn seed_watch_file(loaded: &LoadedPage, path: &Path) -> Result<bool, CliError> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, render_scene_file(&loaded.content)?)?;
    Ok(true)
}

fn report_autosave_event(event: &AutosaveEvent) {
    match event {
        AutosaveEvent::Saved {
            remote_updated_at, ..
        } => println!("Saved at {}", format_timestamp(*remote_updated_at)),
        AutosaveEvent::Failed(message) => eprintln!("Save failed: {message}"),
        AutosaveEvent::Stopped => println!("Stopped"),
        AutosaveEvent::Unchanged | AutosaveEvent::Skipped => {}
    }
}
