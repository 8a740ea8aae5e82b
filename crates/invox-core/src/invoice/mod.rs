//! Local invoice logic: the heuristic extractor used when the service is
//! unavailable, and the validator applied to every extracted record.

pub mod heuristics;
mod patterns;
pub mod validate;

pub use heuristics::heuristic_extract;
pub use validate::validate;
