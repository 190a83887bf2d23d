pub mod chat;
pub mod claude;
pub mod platform;

pub use chat::{ChatError, ChatMessage, ChatProvider, ChatRequest, ChatRole};
pub use claude::ClaudeChatProvider;
pub use platform::{CreatedPlaylist, PlatformError, PlatformStatus, PlaylistPlatform, TrackRef};
