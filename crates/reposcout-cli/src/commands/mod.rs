pub mod inspect;

pub use inspect::InspectCommand;
