use crate::error::{Result, RevenueError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Viewer,
}

/// Dashboard surfaces gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Overview,
    Charts,
    Rankings,
    Heatmap,
    Forecast,
    LiveMetrics,
    Export,
    DataUpload,
    UserManagement,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Feature::Overview,
        Feature::Charts,
        Feature::Rankings,
        Feature::Heatmap,
        Feature::Forecast,
        Feature::LiveMetrics,
        Feature::Export,
        Feature::DataUpload,
        Feature::UserManagement,
    ];
}

impl Role {
    fn capabilities(&self) -> &'static [Feature] {
        match self {
            Role::Admin => &Feature::ALL,
            Role::User => &[
                Feature::Overview,
                Feature::Charts,
                Feature::Rankings,
                Feature::Heatmap,
                Feature::Forecast,
                Feature::LiveMetrics,
                Feature::Export,
            ],
            Role::Viewer => &[
                Feature::Overview,
                Feature::Charts,
                Feature::Heatmap,
                Feature::LiveMetrics,
            ],
        }
    }

    pub fn features(&self) -> impl Iterator<Item = Feature> {
        self.capabilities().iter().copied()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Viewer => "viewer",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = RevenueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "viewer" => Ok(Role::Viewer),
            _ => Err(RevenueError::UnknownRole(s.to_string())),
        }
    }
}

pub fn can_view(role: Role, feature: Feature) -> bool {
    role.capabilities().contains(&feature)
}
