pub mod presence;
pub mod relay;

pub use presence::PresenceDirectory;
pub use relay::NotificationRelay;
