//! Integration modules wiring the CLI to the stores and the pipeline.

pub(crate) mod importer;
pub(crate) mod store_manager;
