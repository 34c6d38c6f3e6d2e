//! Stateful services shared across the app

mod local_store;

pub use local_store::LocalStore;
