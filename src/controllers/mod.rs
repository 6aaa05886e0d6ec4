pub mod admin_controller;
pub mod auth_controller;
pub mod comment_controller;
pub mod file_controller;
pub mod follow_playlist_controller;
pub mod follower_controller;
pub mod genre_controller;
pub mod health_controller;
pub mod like_controller;
pub mod payment_controller;
pub mod playback_controller;
pub mod playlist_controller;
pub mod proxy_controller;
pub mod song_controller;
pub mod subscription_controller;
pub mod user_controller;
