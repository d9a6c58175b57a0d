pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod photo;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use client::{DiaryClient, DiarySummary, Followup, InitialQuestion, Song, SongRecommendation};
pub use config::Config;
pub use controller::DiaryController;
pub use error::DiaryError;
pub use photo::{ImageKind, PhotoPreview, PreparedPhoto, UploadedImage};
pub use session::{DiarySession, Notice};
pub use state::{ChatLog, ChatMessage, ChatRole};

// Front ends render thumbnails with the same image types
pub use image;
