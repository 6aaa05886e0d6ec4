pub mod db_helpers;
pub mod signature_helpers;
pub mod song_helpers;
pub mod thing_helpers;
pub mod upload_helpers;
pub mod user_helpers;
