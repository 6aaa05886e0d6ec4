pub mod admin_routes;
pub mod auth_routes;
pub mod comment_routes;
pub mod file_routes;
pub mod follow_playlist_routes;
pub mod follower_routes;
pub mod genre_routes;
pub mod health_routes;
pub mod like_routes;
pub mod payment_routes;
pub mod playback_routes;
pub mod playlist_routes;
pub mod proxy_routes;
pub mod song_routes;
pub mod subscription_routes;
pub mod user_routes;
