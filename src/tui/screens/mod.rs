pub mod class_info;
pub mod registered;

pub use class_info::ClassInfoScreen;
pub use registered::RegisteredScreen;
