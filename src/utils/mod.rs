//! Shared utilities for the ETL stages.

pub mod arrow;
