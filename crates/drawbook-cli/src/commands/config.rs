use std::env;

use drawbook_core::config::AutosaveConfig;
use drawbook_core::remote::normalize_rest_url;
use drawbook_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, ProfilesFile};
use crate::error::CliError;

/// Values passed to `config init`; unset fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub user_id: Option<String>,
    pub autosave_interval_ms: Option<u64>,
}

impl ProfileUpdate {
    /// Fill unset fields from `SUPABASE_URL`, `SUPABASE_ANON_KEY` and `DRAWBOOK_USER_ID`
    #[must_use]
    pub fn with_env_fallback(self) -> Self {
        Self {
            supabase_url: normalize_text_option(self.supabase_url)
                .or_else(|| normalize_text_option(env::var("SUPABASE_URL").ok())),
            supabase_anon_key: normalize_text_option(self.supabase_anon_key)
                .or_else(|| normalize_text_option(env::var("SUPABASE_ANON_KEY").ok())),
            user_id: normalize_text_option(self.user_id)
                .or_else(|| normalize_text_option(env::var("DRAWBOOK_USER_ID").ok())),
            autosave_interval_ms: self.autosave_interval_ms,
        }
    }
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            user_id,
            autosave_interval_ms,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileUpdate {
                supabase_url,
                supabase_anon_key,
                user_id,
                autosave_interval_ms,
            }
            .with_env_fallback(),
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    update: ProfileUpdate,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = ProfilesFile::load()?;
    let profile_name = config.resolve_profile_name(profile_name);

    let profile = config.profile_entry(&profile_name);
    apply_profile_update(profile, update)?;
    let missing_fields = missing_profile_fields(profile);

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save()?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Export DRAWBOOK_ACCESS_TOKEN to talk to the server."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

pub fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = ProfilesFile::load()?;
    let profile_name = config.resolve_profile_name(profile_name);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();

    println!("profile:              {profile_name}");
    println!(
        "supabase_url:         {}",
        profile.supabase_url().unwrap_or_else(|| "-".to_string())
    );
    println!(
        "supabase_anon_key:    {}",
        if profile.supabase_anon_key().is_some() { "set" } else { "-" }
    );
    println!(
        "user_id:              {}",
        profile.user_id().unwrap_or_else(|| "-".to_string())
    );
    let autosave = AutosaveConfig::from_millis(profile.autosave_interval_ms)
        .map_err(CliError::Config)?;
    println!("autosave_interval_ms: {}", autosave.interval.as_millis());
    println!(
        "access token:         {}",
        if normalize_text_option(env::var("DRAWBOOK_ACCESS_TOKEN").ok()).is_some() {
            "set"
        } else {
            "not set (DRAWBOOK_ACCESS_TOKEN)"
        }
    );
    Ok(())
}

/// Merge explicit values into a profile and validate the result
pub fn apply_profile_update(
    profile: &mut CliProfile,
    update: ProfileUpdate,
) -> Result<(), CliError> {
    if let Some(url) = normalize_text_option(update.supabase_url) {
        normalize_rest_url(&url).map_err(|error| CliError::Config(error.to_string()))?;
        profile.supabase_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(key) = normalize_text_option(update.supabase_anon_key) {
        profile.supabase_anon_key = Some(key);
    }
    if let Some(user_id) = normalize_text_option(update.user_id) {
        profile.user_id = Some(user_id);
    }
    if let Some(interval_ms) = update.autosave_interval_ms {
        AutosaveConfig::from_millis(Some(interval_ms)).map_err(CliError::Config)?;
        profile.autosave_interval_ms = Some(interval_ms);
    }
    Ok(())
}

pub fn missing_profile_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing_fields = Vec::new();
    if profile.supabase_url().is_none() {
        missing_fields.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing_fields.push("supabase_anon_key");
    }
    if profile.user_id().is_none() {
        missing_fields.push("user_id");
    }
    missing_fields
}
