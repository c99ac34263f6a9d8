pub mod history;
pub mod layers;
pub mod text;
pub mod tools;
