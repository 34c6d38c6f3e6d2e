//! Page export helpers shared by every client.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{display_page_name, Folder, FolderId, PageContent, PageSummary};
use crate::util::format_rfc3339_millis;

const SCENE_SOURCE: &str = "drawbook";
const SCENE_VERSION: u32 = 2;

/// Export output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Excalidraw scene document, openable by the drawing library
    Scene,
    /// Bare element array
    Elements,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Scene => "excalidraw",
            Self::Elements => "json",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SceneDocument<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    source: &'static str,
    elements: Vec<&'a Value>,
    app_state: SceneAppState,
    files: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SceneAppState {
    view_background_color: &'static str,
}

/// Render a page as an Excalidraw scene document.
///
/// Elements flagged `isDeleted` are left out.
pub fn render_scene_export(content: &PageContent) -> serde_json::Result<String> {
    render_scene(content.elements().iter().filter(|element| !is_deleted(element)))
}

/// Render a page as a scene file meant to be edited and read back.
///
/// Every element is written, deleted ones included, so parsing the file
/// yields content equal to `content`.
pub fn render_scene_file(content: &PageContent) -> serde_json::Result<String> {
    render_scene(content.elements().iter())
}

fn render_scene<'a>(elements: impl Iterator<Item = &'a Value>) -> serde_json::Result<String> {
    let document = SceneDocument {
        kind: "excalidraw",
        version: SCENE_VERSION,
        source: SCENE_SOURCE,
        elements: elements.collect(),
        app_state: SceneAppState {
            view_background_color: "#ffffff",
        },
        files: BTreeMap::new(),
    };
    serde_json::to_string_pretty(&document)
}

/// Render a page in the selected format
pub fn render_page_export(
    content: &PageContent,
    format: ExportFormat,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Scene => render_scene_export(content),
        ExportFormat::Elements => serde_json::to_string_pretty(content),
    }
}

/// Markdown index of folders and their pages; unfiled pages come last.
#[must_use]
pub fn render_markdown_index(folders: &[Folder], pages: &[PageSummary]) -> String {
    let mut by_folder: BTreeMap<Option<FolderId>, Vec<&PageSummary>> = BTreeMap::new();
    for page in pages {
        by_folder.entry(page.folder_id).or_default().push(page);
    }

    let mut output = String::from("# Pages\n");
    for folder in folders {
        let _ = writeln!(output);
        if folder.icon.is_empty() {
            let _ = writeln!(output, "## {}", folder.name);
        } else {
            let _ = writeln!(output, "## {} {}", folder.icon, folder.name);
        }
        write_page_lines(&mut output, by_folder.remove(&Some(folder.id)).unwrap_or_default());
    }

    // Pages pointing at folders not in the listing are shown as unfiled.
    let unfiled = by_folder.into_values().flatten().collect::<Vec<_>>();
    if !unfiled.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Unfiled");
        write_page_lines(&mut output, unfiled);
    }

    output
}

/// Deterministic file name for a page export.
#[must_use]
pub fn suggested_export_file_name(name: &str, format: ExportFormat) -> String {
    let slug = display_page_name(name)
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "page".to_string() } else { slug };
    format!("{slug}.{}", format.extension())
}

fn write_page_lines(output: &mut String, mut pages: Vec<&PageSummary>) {
    if pages.is_empty() {
        let _ = writeln!(output, "_No pages_");
        return;
    }
    pages.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    for page in pages {
        let _ = writeln!(
            output,
            "- {} (`{}`, updated {})",
            display_page_name(&page.name),
            page.id,
            format_rfc3339_millis(page.updated_at)
        );
    }
}

fn is_deleted(element: &Value) -> bool {
    element
        .get("isDeleted")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
