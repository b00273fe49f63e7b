//! Integration tests

mod common;
mod config_test;
mod delivery_test;
mod pipeline_test;
