//! Dog records and their API projections.
//!
//! Defines [`Dog`] (the stored record), [`DogSummary`] (the reduced 1.0
//! projection), and [`ApiVersion`] (which shape a listing returns).

use serde::{Deserialize, Serialize};

/// A dog record, matching the `dogs` table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dog {
    /// Assigned by storage; never changes.
    pub id: i64,
    pub name: String,
    /// Empty until the dog is adopted.
    pub owner: String,
    pub description: String,
}

impl Dog {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        owner: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner: owner.into(),
            description: description.into(),
        }
    }
}

/// Version 1.0 shape of a dog: `{"id": 1, "fullName": "Rex"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DogSummary {
    pub id: i64,
    #[serde(rename = "fullName")]
    pub full_name: String,
}

impl From<&Dog> for DogSummary {
    fn from(dog: &Dog) -> Self {
        Self {
            id: dog.id,
            full_name: dog.name.clone(),
        }
    }
}

/// Listing API versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    /// Reduced `{id, fullName}` projection, kept for older clients.
    V1_0,
    /// Full records.
    #[default]
    V1_1,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
        }
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" => Ok(Self::V1_0),
            "1.1" => Ok(Self::V1_1),
            other => Err(format!("unsupported API version: {other}. Supported: 1.0, 1.1")),
        }
    }
}
