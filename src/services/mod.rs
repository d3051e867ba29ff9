pub mod download_watcher;
pub mod export_trigger;
pub mod field_input;
pub mod portal_login;
pub mod uniqueness;

pub use download_watcher::{batch_file_name, DownloadWatcher};
pub use export_trigger::{ExportStrategy, ExportTrigger};
pub use field_input::{check_insertion, ClearOutcome, ClearStrategy, FieldInput, InsertStrategy, InsertionCheck};
pub use portal_login::{is_login_page, PortalLogin};
pub use uniqueness::{audit_uniqueness, content_digest, DuplicatePair};
