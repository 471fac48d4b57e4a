//! Shared utilities.
//!
//! Includes:
//! - Concurrency helpers (semaphore-bounded gather, worker pool, panic capture)
//! - String normalization helpers
//! - Vector similarity (cosine)
//! - Date/time formatting for prompt rendering

pub mod concurrency;
pub mod datetime;
pub mod similarity;
pub mod text;

pub use concurrency::{gather_bounded, process_with_workers};
pub use datetime::format_validity;
pub use similarity::cosine_similarity;
pub use text::{extract_json_from_response, normalize_whitespace, truncate_with_ellipsis};
