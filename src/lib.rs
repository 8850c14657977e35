//! Authenticated S3 and CodeDeploy clients
//!
//! Builds both clients for one region and proxy from a chosen credential
//! mode, resolves the caller's account ID and runs a connectivity probe.

pub mod aws;
pub mod settings;
