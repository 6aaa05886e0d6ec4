pub mod admin_service;
pub mod auth_service;
pub mod comment_service;
pub mod follow_playlist_service;
pub mod follower_service;
pub mod genre_service;
pub mod like_service;
pub mod lyrics_service;
pub mod payment_service;
pub mod playback_service;
pub mod playlist_service;
pub mod report_service;
pub mod song_service;
pub mod storage_service;
pub mod subscription_service;
pub mod user_service;
pub mod vector_service;
