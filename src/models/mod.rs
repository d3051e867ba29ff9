pub mod acquired;
pub mod batch;
pub mod code;
pub mod loaders;
pub mod table;

pub use acquired::AcquiredFile;
pub use batch::{plan, Batch};
pub use code::{normalize, normalize_all, normalize_cell};
pub use loaders::load_table;
pub use table::{CellValue, Table};
