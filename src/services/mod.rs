pub mod ai_service;
pub mod export_service;
pub mod generation_service;
pub mod image_service;
pub mod projection_service;
pub mod prompt_service;
pub mod quiz_validator;
pub mod session_service;
