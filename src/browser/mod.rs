pub mod headless;

pub use headless::{IsolatedBrowser, LaunchOptions};
