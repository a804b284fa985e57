//! Reference plugins built on the host surfaces in `bridge-traits`.
//!
//! Each one is optional; hosts register the ones matching the surfaces they
//! implement with [`PlaybackController::add_plugin`](crate::PlaybackController::add_plugin).

mod audio_focus;
mod lock_screen;
mod notification;

pub use audio_focus::AudioFocusPlugin;
pub use lock_screen::LockScreenControlsPlugin;
pub use notification::{NotificationPlugin, DEFAULT_NOTIFICATION_ID};
