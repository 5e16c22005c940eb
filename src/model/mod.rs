pub mod analysis;
pub mod dialogue;
pub mod message;
pub mod presentation;
