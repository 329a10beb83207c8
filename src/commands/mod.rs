mod analyze;
mod validate;

pub use analyze::run_analyze;
pub use validate::run_validate;
