// fortikit-core: Inventory-driven operations over Fortinet products.
//
// Each tool resolves assets from the inventory, drives the matching
// `fortikit-api` client, and collects per-host results into a `Report`.
// Rendering is left to the CLI.

pub mod context;
pub mod error;
pub mod report;
pub mod tools;

pub use context::Context;
pub use error::CoreError;
pub use report::{Level, Message, Report};
