//! CLI `dogs` commands — list dogs and record adoptions against the local database.

use anyhow::Result;

use pooch_palace::config::PoochConfig;
use pooch_palace::dogs::adoption::Adoptions;
use pooch_palace::dogs::listing::list_dogs;
use pooch_palace::dogs::types::ApiVersion;

/// Print the dog listing as JSON in the requested version's shape.
pub fn list(config: &PoochConfig, version: ApiVersion) -> Result<()> {
    let repo = super::open_repository(config)?;
    let listing = list_dogs(repo.as_ref(), version)?;
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

/// Give a dog to a new owner.
pub fn adopt(config: &PoochConfig, dog_id: i64, owner: &str) -> Result<()> {
    let repo = super::open_repository(config)?;
    let adoptions = Adoptions::new(repo);
    match adoptions.adopt(dog_id, owner)? {
        Some(dog) => println!("{} (#{}) now lives with {}", dog.name, dog.id, dog.owner),
        None => println!("No dog with id {dog_id}; nothing changed."),
    }
    Ok(())
}
