pub mod common;
pub mod completions;
pub mod config;
pub mod draft;
pub mod folder;
pub mod page;
pub mod scene_file;
pub mod search;
