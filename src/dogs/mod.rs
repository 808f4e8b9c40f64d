pub mod adoption;
pub mod listing;
pub mod repository;
pub mod types;
