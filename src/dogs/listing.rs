//! Versioned dog listings.

use anyhow::Result;
use serde::Serialize;

use super::repository::DogRepository;
use super::types::{ApiVersion, Dog, DogSummary};

/// A listing in the shape requested by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DogListing {
    Full(Vec<Dog>),
    Summary(Vec<DogSummary>),
}

impl DogListing {
    pub fn len(&self) -> usize {
        match self {
            Self::Full(dogs) => dogs.len(),
            Self::Summary(dogs) => dogs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Project a full listing to `version`.
pub fn project(dogs: Vec<Dog>, version: ApiVersion) -> DogListing {
    match version {
        ApiVersion::V1_1 => DogListing::Full(dogs),
        ApiVersion::V1_0 => DogListing::Summary(dogs.iter().map(DogSummary::from).collect()),
    }
}

pub fn list_dogs(repo: &dyn DogRepository, version: ApiVersion) -> Result<DogListing> {
    let dogs = repo.find_all()?;
    tracing::debug!(count = dogs.len(), version = %version, "listing dogs");
    Ok(project(dogs, version))
}
