//! AWS region identifiers

use crate::aws::error::ConfigurationError;
use std::fmt;

/// Region identifiers accepted by [`AwsRegion::parse`].
pub const KNOWN_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-east-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-southeast-5",
    "ap-southeast-7",
    "ca-central-1",
    "ca-west-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "mx-central-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-gov-east-1",
    "us-gov-west-1",
    "us-west-1",
    "us-west-2",
];

/// Region used for global services such as IAM.
pub const GLOBAL_REGION: &str = "us-east-1";

/// A validated AWS region identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsRegion(&'static str);

impl AwsRegion {
    /// Validate a region name. Surrounding whitespace and case are ignored.
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        let wanted = name.trim().to_ascii_lowercase();
        KNOWN_REGIONS
            .iter()
            .copied()
            .find(|r| *r == wanted)
            .map(AwsRegion)
            .ok_or_else(|| ConfigurationError::UnknownRegion(name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Convert into the SDK region type
    pub fn to_sdk(&self) -> aws_config::Region {
        aws_config::Region::from_static(self.0)
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_region() {
        let region = AwsRegion::parse("eu-west-1").unwrap();
        assert_eq!(region.as_str(), "eu-west-1");
        assert_eq!(region.to_string(), "eu-west-1");
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let region = AwsRegion::parse("  US-EAST-2 ").unwrap();
        assert_eq!(region.as_str(), "us-east-2");
    }

    #[test]
    fn test_parse_unknown_region() {
        let err = AwsRegion::parse("mars-north-1").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownRegion(ref r) if r == "mars-north-1"));
    }

    #[test]
    fn test_parse_empty_region() {
        assert!(AwsRegion::parse("").is_err());
    }

    #[test]
    fn test_global_region_is_known() {
        assert!(AwsRegion::parse(GLOBAL_REGION).is_ok());
    }
}
