//! 结果表输出

pub mod layout;
pub mod writer;

pub use layout::{Anchor, ColorScale, ReportLayout};
pub use writer::{column_letter, write_plain, RenderMode, SpreadsheetWriter};
