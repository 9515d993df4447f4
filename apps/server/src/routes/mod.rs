pub mod configurations;
pub mod forms;
pub mod health;
