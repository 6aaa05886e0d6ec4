pub mod text_validator;
pub mod user_validator;
