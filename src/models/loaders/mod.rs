pub mod tabular_loader;

pub use tabular_loader::load_table;
