pub mod entities;
pub mod gradebook;
