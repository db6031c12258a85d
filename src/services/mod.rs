pub mod auth_service;
pub mod llm_service;
