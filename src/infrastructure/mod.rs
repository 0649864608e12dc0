pub mod file_confirmed_mappings_store;
pub mod json_tree_loader;

pub use file_confirmed_mappings_store::FileConfirmedMappingsStore;
pub use json_tree_loader::JsonTreeLoader;
