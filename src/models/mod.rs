pub mod admin;
pub mod flag_report;
pub mod genre;
pub mod payment;
pub mod playback;
pub mod playlist;
pub mod social;
pub mod song;
pub mod subscription;
pub mod system;
pub mod user;

pub mod database_helpers;
pub mod pagination;
