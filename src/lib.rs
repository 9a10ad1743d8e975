//! TenantDB Admin Library
//!
//! Schema-per-tenant PostgreSQL administration: schema provisioning, export of
//! a schema to a self-describing JSON document, and transactional import or
//! migration of that document into another schema.

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod pool;
pub mod schema;
pub mod security;
pub mod tenant;
