pub mod build_service;

pub use build_service::{BuildError, BuildOutcome, BuildRequest, BuildService, SharedConsole, Stage};
