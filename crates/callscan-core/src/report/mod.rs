//! Result assembly, persistence and HTML rendering.

pub mod assemble;
pub mod html;
pub mod persist;

pub use assemble::{assemble, AnalysisResults};
pub use html::{render_html, write_html_report};
pub use persist::{load_results, save_results};
