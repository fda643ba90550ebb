//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the rows of the current
//! view, the selection and the filter.

mod fuzzy;
mod model;

pub use model::*;
