pub mod catalog;
pub mod document;
pub mod question;
pub mod quiz;
pub mod quiz_config;
