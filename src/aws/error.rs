//! Error types for client construction, credential resolution,
//! account lookup and connectivity probing

use aws_sdk_codedeploy::operation::get_application::GetApplicationError;
use aws_sdk_iam::operation::get_user::GetUserError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStreamError;
use aws_sdk_sts::operation::assume_role::AssumeRoleError;
use thiserror::Error;

/// Invalid static configuration. Raised before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unrecognized AWS region '{0}'")]
    UnknownRegion(String),

    #[error("invalid proxy address {host}:{port}: {reason}")]
    InvalidProxy {
        host: String,
        port: i32,
        reason: String,
    },

    #[error("failed to initialize proxy connector: {0}")]
    ProxyConnector(#[source] std::io::Error),

    #[error("invalid endpoint URL '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure to obtain credentials for the selected mode.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to assume role {role_arn}")]
    AssumeRole {
        role_arn: String,
        #[source]
        source: aws_sdk_sts::error::SdkError<AssumeRoleError>,
    },

    #[error("AssumeRole for {0} returned no credentials")]
    MissingSessionCredentials(String),

    #[error("AWS profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("AWS profile '{name}' is not usable: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("failed to read AWS profile files")]
    ProfileFiles(#[source] std::io::Error),

    #[error("malformed access key pair: {0}")]
    MalformedKeyPair(&'static str),
}

/// Failure to determine the caller's account ID.
#[derive(Debug, Error)]
pub enum AccountResolutionError {
    #[error("identity lookup failed")]
    IdentityLookup(#[source] aws_sdk_iam::error::SdkError<GetUserError>),

    #[error("no ARN found for the current identity")]
    ArnNotFound,

    #[error("malformed ARN '{0}'")]
    MalformedArn(String),
}

/// Failure during the connectivity probe. SDK errors are kept as-is.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to create probe file")]
    TempFile(#[source] std::io::Error),

    #[error("failed to read probe file")]
    Body(#[source] ByteStreamError),

    #[error("failed to upload s3://{bucket}/{key}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: aws_sdk_s3::error::SdkError<PutObjectError>,
    },

    #[error("failed to look up CodeDeploy application '{application}'")]
    ApplicationLookup {
        application: String,
        #[source]
        source: aws_sdk_codedeploy::error::SdkError<GetApplicationError>,
    },
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    AccountResolution(#[from] AccountResolutionError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
