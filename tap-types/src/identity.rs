use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::UserId;

/// User descriptor supplied by the host platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlatformUser {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Everything the host hands over at launch: the user and an optional
/// referral token taken from the start parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LaunchContext {
    pub user: PlatformUser,
    #[serde(default)]
    pub start_param: Option<String>,
}

impl LaunchContext {
    pub fn new(user: PlatformUser) -> Self {
        Self {
            user,
            start_param: None,
        }
    }

    pub fn with_start_param(mut self, start_param: impl Into<String>) -> Self {
        self.start_param = Some(start_param.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_context_from_init_data_json() {
        let json = r#"{"user":{"id":777,"username":"zenith","first_name":"Zen"},"start_param":"ref_12"}"#;
        let ctx: LaunchContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.user.id, 777);
        assert_eq!(ctx.user.username.as_deref(), Some("zenith"));
        assert_eq!(ctx.user.last_name, None);
        assert_eq!(ctx.start_param.as_deref(), Some("ref_12"));
    }
}
