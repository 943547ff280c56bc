pub mod message;

pub use message::{Message, MessageStatus, ParticipantId, SendIntent};
