pub mod build;

pub use build::{build_api, build_legacy, health};
