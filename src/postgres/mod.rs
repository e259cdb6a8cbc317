// ABOUTME: PostgreSQL database access for table export and import
// ABOUTME: Re-exports connection setup plus row reading and writing helpers

pub mod connection;
pub mod reader;
pub mod writer;

pub use connection::connect;
