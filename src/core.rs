pub mod catalog;
pub mod pattern;
pub mod tokenizer;
pub mod resolver;
pub mod links;
pub mod calculator;
pub mod registry;
pub mod participants;
pub mod engine;
pub mod render;

pub use engine::{ConversionEngine, EngineSnapshot};
pub use links::{ConversationContext, StaticContext};
pub use participants::{ChannelMessage, MessageContext};
