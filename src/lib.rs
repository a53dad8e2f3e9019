pub mod core;
pub mod shared;
pub mod store;

pub use crate::core::{ChannelMessage, ConversationContext, ConversionEngine, MessageContext, StaticContext};
pub use crate::shared::settings::EngineSettings;
pub use crate::shared::types::{
    CommunityCurrencyAllowance, ConversionResult, Quantity, ScanOutcome, Unit, UnitKind,
};
pub use crate::shared::{EngineError, EngineResult};
pub use crate::store::{MemoryStore, RedbStore, UnitStore};
