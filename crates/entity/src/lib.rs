pub mod user;
pub mod session;
pub mod event;
pub mod registration;
pub mod attendance;

pub use user::Entity as User;
pub use session::Entity as Session;
pub use event::Entity as Event;
pub use registration::Entity as Registration;
pub use attendance::Entity as Attendance;
