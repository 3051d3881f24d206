//! Shared AWS SDK configuration.

use aws_config::{BehaviorVersion, SdkConfig};

/// Load SDK configuration from the environment, pinned to `region` when given.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}
