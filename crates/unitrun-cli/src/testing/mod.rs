//! Test runner infrastructure for unitrun
//!
//! Discovers test files by name pattern, executes them one at a time,
//! interprets their TAP output and reports aggregate results.

pub mod discovery;
pub mod pattern;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod tap;

pub use discovery::TestSuite;
pub use pattern::Pattern;
pub use reporter::TestReporter;
pub use result::RunSummary;
pub use runner::TestRunner;
