// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{crawl_config_from_args, load_weights, parse_url_line};

// Re-export the audit entry points from sitescore-core
pub use sitescore_core::crawl::{AuditOptions, execute_audit};
pub use sitescore_scanner::links::extract_url_path;
