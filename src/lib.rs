// ABOUTME: Library module for fam-db-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod database;
pub mod errors;
pub mod export;
pub mod filters;
pub mod import;
pub mod interactive;
pub mod manifest;
pub mod postgres;
pub mod progress;
pub mod serializers;
pub mod sqlite;
pub mod utils;
