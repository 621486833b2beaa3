pub mod admin;
pub mod auth;
pub mod grades;
pub mod health;
pub mod student;
pub mod teacher;
pub mod users;
