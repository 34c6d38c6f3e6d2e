use std::sync::Arc;

use chrono::Utc;
use drawbook_core::autosave::SnapshotSource;
use drawbook_core::config::AutosaveConfig;
use drawbook_core::drafts::DraftStore;
use drawbook_core::export::{suggested_export_file_name, ExportFormat as CoreExportFormat};
use drawbook_core::remote::{MemoryRemoteStore, RemoteStore};
use drawbook_core::services::LocalStore;
use drawbook_core::{CaptureOutcome, LocalDraft, PageContent, PageId};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::{CompletionShell, ExportFormat};
use crate::commands::common::{
    format_relative_time, normalize_search_query, parse_scene, pick_unique_prefix_match,
    resolve_page_id, resolve_remote_settings, AppContext,
};
use crate::commands::completions::run_completions;
use crate::commands::config::{apply_profile_update, missing_profile_fields, ProfileUpdate};
use crate::commands::draft::{list_draft_items, run_draft_discard};
use crate::commands::folder::{list_folder_items, run_folder_delete, run_folder_new};
use crate::commands::page::{
    run_page_delete, run_page_export, run_page_new, run_page_refresh, run_page_save,
    seed_watch_file,
};
use crate::commands::scene_file::SceneFileSource;
use crate::commands::search::search_names;
use crate::config_profiles::CliProfile;
use crate::error::CliError;

const OWNER: &str = "owner-1";

fn context() -> (Arc<MemoryRemoteStore>, AppContext) {
    let remote = Arc::new(MemoryRemoteStore::new());
    let store = LocalStore::open_in_memory().unwrap();
    let ctx = AppContext::new(
        OWNER,
        remote.clone() as Arc<dyn RemoteStore>,
        store,
        AutosaveConfig::default(),
    );
    (remote, ctx)
}

fn scene_json(label: &str) -> String {
    json!({
        "type": "excalidraw",
        "version": 2,
        "elements": [{"id": label, "type": "rectangle", "x": 10, "y": 20}]
    })
    .to_string()
}

fn complete_profile() -> CliProfile {
    CliProfile {
        supabase_url: Some("https://project.supabase.co/".to_string()),
        supabase_anon_key: Some("anon".to_string()),
        user_id: Some("profile-user".to_string()),
        autosave_interval_ms: None,
    }
}

#[test]
fn normalize_search_query_trims_and_rejects_empty() {
    assert_eq!(normalize_search_query("  cats ").unwrap(), "cats");
    assert!(matches!(
        normalize_search_query(" \n "),
        Err(CliError::EmptySearchQuery)
    ));
}

#[test]
fn format_relative_time_buckets() {
    let now = 10 * 365 * 24 * 3_600_000;
    assert_eq!(format_relative_time(now - 5_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3_600_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 24 * 3_600_000, now), "2d ago");
    assert_eq!(format_relative_time(now + 60_000, now), "just now");
}

#[test]
fn prefix_match_requires_a_unique_candidate() {
    assert_eq!(pick_unique_prefix_match("ab", Vec::new()).unwrap(), None);
    assert_eq!(
        pick_unique_prefix_match("ab", vec!["abc".to_string()]).unwrap(),
        Some("abc".to_string())
    );
    assert!(matches!(
        pick_unique_prefix_match("ab", vec!["abc".to_string(), "abd".to_string()]),
        Err(CliError::AmbiguousId(_))
    ));
}

#[test]
fn remote_settings_need_url_key_token_and_user() {
    let settings =
        resolve_remote_settings(&complete_profile(), Some("token".to_string()), None).unwrap();
    assert_eq!(settings.owner_id, "profile-user");
    assert_eq!(settings.remote.supabase_url, "https://project.supabase.co");
    assert_eq!(settings.autosave, AutosaveConfig::default());

    let overridden = resolve_remote_settings(
        &complete_profile(),
        Some("token".to_string()),
        Some(" env-user ".to_string()),
    )
    .unwrap();
    assert_eq!(overridden.owner_id, "env-user");

    assert!(matches!(
        resolve_remote_settings(&complete_profile(), None, None),
        Err(CliError::Config(message)) if message.contains("access token")
    ));
    assert!(matches!(
        resolve_remote_settings(&CliProfile::default(), None, None),
        Err(CliError::RemoteNotConfigured)
    ));

    let anonymous = CliProfile {
        user_id: None,
        ..complete_profile()
    };
    assert!(matches!(
        resolve_remote_settings(&anonymous, Some("token".to_string()), None),
        Err(CliError::Config(_))
    ));
}

#[test]
fn profile_update_validates_and_keeps_unset_fields() {
    let mut profile = complete_profile();
    apply_profile_update(
        &mut profile,
        ProfileUpdate {
            autosave_interval_ms: Some(5_000),
            ..ProfileUpdate::default()
        },
    )
    .unwrap();
    assert_eq!(profile.user_id.as_deref(), Some("profile-user"));
    assert_eq!(profile.autosave_interval_ms, Some(5_000));

    let bad_url = apply_profile_update(
        &mut profile,
        ProfileUpdate {
            supabase_url: Some("project.supabase.co".to_string()),
            ..ProfileUpdate::default()
        },
    );
    assert!(matches!(bad_url, Err(CliError::Config(_))));

    let too_fast = apply_profile_update(
        &mut profile,
        ProfileUpdate {
            autosave_interval_ms: Some(10),
            ..ProfileUpdate::default()
        },
    );
    assert!(matches!(too_fast, Err(CliError::Config(_))));

    assert_eq!(missing_profile_fields(&profile), Vec::<&str>::new());
    assert_eq!(
        missing_profile_fields(&CliProfile::default()),
        vec!["supabase_url", "supabase_anon_key", "user_id"]
    );
}

#[test]
fn parse_scene_accepts_documents_and_element_arrays() {
    let from_scene = parse_scene(&scene_json("a")).unwrap();
    let from_array = parse_scene(r#"[{"id":"a","type":"rectangle","x":10,"y":20}]"#).unwrap();
    assert_eq!(from_scene, from_array);
    assert!(matches!(
        parse_scene("{\"elements\": [{}]}"),
        Err(CliError::Core(drawbook_core::Error::Diagram(_)))
    ));
}

#[test]
fn scene_file_source_reads_the_file_on_every_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("canvas.excalidraw");
    let source = SceneFileSource::new(&path, "Sketch");

    assert_eq!(source.snapshot().unwrap(), None);

    std::fs::write(&path, "   ").unwrap();
    assert_eq!(source.snapshot().unwrap(), None);

    std::fs::write(&path, scene_json("first")).unwrap();
    let snapshot = source.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.name, "Sketch");
    assert_eq!(snapshot.content.elements()[0]["id"], "first");

    std::fs::write(&path, "{ broken").unwrap();
    assert!(source.snapshot().is_err());
}

#[tokio::test]
async fn new_page_from_file_then_save_twice_writes_once() {
    let (remote, ctx) = context();
    let dir = tempfile::tempdir().unwrap();
    let initial = dir.path().join("initial.json");
    std::fs::write(&initial, scene_json("seed")).unwrap();

    let record = run_page_new(
        &ctx,
        &["Floor".to_string(), "plan".to_string()],
        None,
        Some(initial.as_path()),
    )
    .await
    .unwrap();
    assert_eq!(record.name, "Floor plan");
    assert_eq!(record.content.len(), 1);

    let edited = dir.path().join("edited.json");
    std::fs::write(&edited, scene_json("edited")).unwrap();
    let id = record.id.to_string();

    let first = run_page_save(&ctx, &id, &edited, None).await.unwrap();
    assert!(matches!(first, CaptureOutcome::Saved { .. }));
    let second = run_page_save(&ctx, &id, &edited, None).await.unwrap();
    assert_eq!(second, CaptureOutcome::Unchanged);
    assert_eq!(remote.page_writes(), 1);

    let stored = remote.get_page(&record.id).await.unwrap();
    assert_eq!(stored.content, parse_scene(&scene_json("edited")).unwrap());
    assert_eq!(stored.name, "Floor plan");
}

#[tokio::test]
async fn watch_file_with_deleted_elements_is_unchanged_on_first_tick() {
    let (remote, ctx) = context();
    let dir = tempfile::tempdir().unwrap();
    let initial = dir.path().join("initial.json");
    std::fs::write(
        &initial,
        json!([
            {"id": "kept", "type": "rectangle", "x": 1.5},
            {"id": "gone", "type": "ellipse", "isDeleted": true}
        ])
        .to_string(),
    )
    .unwrap();
    let record = run_page_new(&ctx, &["Plan".to_string()], None, Some(initial.as_path()))
        .await
        .unwrap();
    assert_eq!(record.content.len(), 2);

    let session = ctx.reconciler.open(record.id);
    let loaded = session.load_initial_state().await.unwrap();
    let watched = dir.path().join("plan.excalidraw");
    assert!(seed_watch_file(&loaded, &watched).unwrap());
    assert!(!seed_watch_file(&loaded, &watched).unwrap());

    let writes_before = remote.page_writes();
    let snapshot = SceneFileSource::new(&watched, loaded.name.clone())
        .snapshot()
        .unwrap()
        .unwrap();
    let outcome = session
        .capture_and_persist(snapshot.content, &snapshot.name)
        .await
        .unwrap();

    assert_eq!(outcome, CaptureOutcome::Unchanged);
    assert_eq!(remote.page_writes(), writes_before);
    assert_eq!(remote.get_page(&record.id).await.unwrap().content.len(), 2);
}

#[tokio::test]
async fn refresh_refuses_to_drop_a_newer_draft_without_yes() {
    let (_remote, ctx) = context();
    let record = run_page_new(&ctx, &["Draft".to_string()], None, None)
        .await
        .unwrap();
    let future = Utc::now().timestamp_millis() + 60_000;
    ctx.store
        .set(LocalDraft::new(
            record.id,
            "Draft",
            parse_scene(&scene_json("offline")).unwrap(),
            future,
        ))
        .unwrap();

    let refused = run_page_refresh(&ctx, &record.id.to_string(), false, None).await;
    assert!(matches!(
        refused,
        Err(CliError::RefreshNeedsConfirmation { .. })
    ));
    assert_eq!(ctx.store.get(&record.id).unwrap().unwrap().updated_at, future);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("server.excalidraw");
    let loaded = run_page_refresh(&ctx, &record.id.to_string(), true, Some(output.as_path()))
        .await
        .unwrap();
    assert_eq!(loaded.content, PageContent::empty());
    assert!(output.exists());
    let draft = ctx.store.get(&record.id).unwrap().unwrap();
    assert_eq!(draft.updated_at, record.updated_at);
    assert_eq!(draft.content, PageContent::empty());
}

#[tokio::test]
async fn delete_removes_page_and_draft() {
    let (remote, ctx) = context();
    let record = run_page_new(&ctx, &["Doomed".to_string()], None, None)
        .await
        .unwrap();
    ctx.store
        .set(LocalDraft::from_record(&record))
        .unwrap();

    run_page_delete(&ctx, &record.id.to_string()).await.unwrap();
    assert!(remote.get_page(&record.id).await.is_err());
    assert!(ctx.store.get(&record.id).unwrap().is_none());
    assert!(list_draft_items(&ctx.store).unwrap().is_empty());
}

#[tokio::test]
async fn pages_resolve_by_unique_prefix() {
    let (_remote, ctx) = context();
    let record = run_page_new(&ctx, &["Prefix".to_string()], None, None)
        .await
        .unwrap();
    let full = record.id.to_string();

    let resolved = resolve_page_id(&full[..8].to_uppercase(), &ctx.pages)
        .await
        .unwrap();
    assert_eq!(resolved, record.id);
    assert!(matches!(
        resolve_page_id("   ", &ctx.pages).await,
        Err(CliError::EmptyPageId)
    ));
    assert!(matches!(
        resolve_page_id("zzzz", &ctx.pages).await,
        Err(CliError::InvalidPageId(_))
    ));
}

#[tokio::test]
async fn folder_counts_follow_page_moves_and_deletes() {
    let (_remote, ctx) = context();
    let folder = run_folder_new(&ctx, &["  Sketches ".to_string()], "✏️")
        .await
        .unwrap();
    assert_eq!(folder.name, "Sketches");

    let folder_id = folder.id.to_string();
    run_page_new(&ctx, &["One".to_string()], Some(folder_id.as_str()), None)
        .await
        .unwrap();
    run_page_new(&ctx, &["Two".to_string()], None, None)
        .await
        .unwrap();

    let items = list_folder_items(&ctx).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].page_count, 1);
    assert_eq!(items[0].icon, "✏️");

    run_folder_delete(&ctx, &folder_id).await.unwrap();
    assert!(list_folder_items(&ctx).await.unwrap().is_empty());
    assert!(ctx.folders.cached().unwrap().is_empty());

    let unfiled = ctx
        .pages
        .list_pages(drawbook_core::pages::FolderFilter::Unfiled)
        .await
        .unwrap();
    assert_eq!(unfiled.len(), 2);
}

#[tokio::test]
async fn search_sees_pages_created_after_the_first_listing() {
    let (_remote, ctx) = context();
    run_page_new(&ctx, &["Garden layout".to_string()], None, None)
        .await
        .unwrap();
    assert_eq!(search_names(&ctx, "garden").await.unwrap().pages.len(), 1);

    run_page_new(&ctx, &["Garden shed".to_string()], None, None)
        .await
        .unwrap();
    assert_eq!(search_names(&ctx, "GARDEN").await.unwrap().pages.len(), 2);
    assert!(matches!(
        search_names(&ctx, "  ").await,
        Err(CliError::EmptySearchQuery)
    ));
}

#[tokio::test]
async fn export_into_directory_uses_suggested_file_name() {
    let (_remote, ctx) = context();
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.json");
    std::fs::write(&source, scene_json("exported")).unwrap();
    let record = run_page_new(&ctx, &["Roof Plan".to_string()], None, Some(source.as_path()))
        .await
        .unwrap();

    run_page_export(&ctx, &record.id.to_string(), ExportFormat::Scene, Some(dir.path()))
        .await
        .unwrap();

    let expected = dir
        .path()
        .join(suggested_export_file_name("Roof Plan", CoreExportFormat::Scene));
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(expected).unwrap()).unwrap();
    assert_eq!(written["type"], "excalidraw");
    assert_eq!(written["elements"][0]["id"], "exported");
}

#[test]
fn draft_discard_rejects_bad_ids_and_reports_removal() {
    let store = LocalStore::open_in_memory().unwrap();
    let page_id = PageId::new();
    store
        .set(LocalDraft::new(page_id, "Kept", PageContent::empty(), 5))
        .unwrap();

    assert!(matches!(
        run_draft_discard(&store, "not-a-uuid"),
        Err(CliError::InvalidPageId(_))
    ));
    assert!(matches!(
        run_draft_discard(&store, ""),
        Err(CliError::EmptyPageId)
    ));
    assert!(run_draft_discard(&store, &page_id.to_string()).unwrap());
    assert!(!run_draft_discard(&store, &page_id.to_string()).unwrap());
}

#[test]
fn run_completions_writes_bash_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drawbook.bash");
    run_completions(CompletionShell::Bash, Some(path.as_path())).unwrap();
    let script = std::fs::read_to_string(path).unwrap();
    assert!(script.contains("drawbook"));
}
