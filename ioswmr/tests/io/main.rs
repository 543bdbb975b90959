//! Integration tests for the backing stores

mod file;
mod memory;
