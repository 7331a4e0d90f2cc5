//! Unit tests for individual components

mod builders_test;
mod error_test;
mod queue_test;
mod util_test;
