pub mod attendance;
pub mod events;
pub mod registrations;
