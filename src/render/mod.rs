//! Renderers for a built `Graph`.

pub mod json;
pub mod make;

pub use json::render_json;
pub use make::render_make;
