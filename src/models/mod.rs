pub mod dates;
pub mod enums;
pub mod midwife;
pub mod appointment;
pub mod child;
pub mod vaccine;
pub mod event;
pub mod user;

pub use midwife::*;
pub use appointment::*;
pub use child::*;
pub use vaccine::*;
pub use event::*;
pub use user::*;
