pub mod codegen;
pub mod config;
pub mod db;
pub mod editor;
pub mod error;
pub mod schema;
pub mod sql;
