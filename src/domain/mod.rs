pub mod identifier;
pub mod note;
pub mod tags;
