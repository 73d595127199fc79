//! Run outputs.
//!
//! - [`json`]: the per-run snapshot consumed by downstream summarizers
//!
//! ```text
//! output_dir/
//! ├── all_sources_20250102_083000.json
//! └── all_sources_20250102_203000.json
//! ```

pub mod json;
