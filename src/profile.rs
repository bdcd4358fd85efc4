//! Declared browser environment.
//!
//! One snapshot of navigator/screen properties feeds two outputs: the
//! environment signature folded into the fingerprint, and the
//! `browser_info` profile sent with each behavior report.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Text of a property the browser does not expose.
pub const UNEXPOSED: &str = "undefined";

/// Navigator and screen properties as the page declares them.
///
/// Text fields hold what JavaScript would print for the property, so an
/// unexposed property reads `undefined`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeclaredEnvironment {
    pub user_agent: String,
    pub platform: String,
    pub vendor: String,
    /// `None` when not exposed or reported as 0.
    pub hardware_concurrency: Option<u32>,
    pub language: String,
    pub languages: Vec<String>,
    /// `None` when the browser has no `navigator.webdriver`.
    pub webdriver: Option<bool>,
    pub plugins_count: u32,
    pub max_touch_points: u32,
    pub color_depth: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl DeclaredEnvironment {
    /// Environment with no property exposed, as read when `navigator` is
    /// missing altogether.
    pub fn unexposed() -> Self {
        Self {
            user_agent: UNEXPOSED.to_string(),
            platform: UNEXPOSED.to_string(),
            vendor: UNEXPOSED.to_string(),
            language: UNEXPOSED.to_string(),
            ..Self::default()
        }
    }

    /// Labelled environment signature folded into the fingerprint.
    pub fn signature(&self) -> String {
        let concurrency = match self.hardware_concurrency {
            Some(n) if n > 0 => n.to_string(),
            _ => "unknown".to_string(),
        };
        format!(
            "UserAgent: {}, Platform: {}, Vendor: {}, HardwareConcurrency: {}, Language: {}, ColorDepth: {}, Resolution: {}",
            self.user_agent,
            self.platform,
            self.vendor,
            concurrency,
            self.language,
            self.color_depth,
            self.resolution(),
        )
    }

    /// Profile submitted as `browser_info`.
    pub fn profile(&self) -> EnvironmentProfile {
        EnvironmentProfile {
            user_agent: self.user_agent.clone(),
            platform: self.platform.clone(),
            webdriver: self.webdriver,
            languages: self.languages.clone(),
            plugins_count: self.plugins_count,
            screen_resolution: self.resolution(),
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            max_touch_points: self.max_touch_points,
        }
    }

    fn resolution(&self) -> String {
        format!("{}x{}", self.screen_width, self.screen_height)
    }
}

/// Environment metadata sent alongside behavior data.
///
/// Read fresh for every submission, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentProfile {
    pub user_agent: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webdriver: Option<bool>,
    pub languages: Vec<String>,
    pub plugins_count: u32,
    pub screen_resolution: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub max_touch_points: u32,
}

impl EnvironmentProfile {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
