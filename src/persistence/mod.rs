pub(crate) mod atomic_io;
pub mod blocks;
pub mod error;
pub mod index;
pub mod paths;
pub mod schema;
pub mod serializer;
pub mod stash;
pub mod tagged_line;

pub use error::{PersistenceError, PersistenceResult};
pub use index::{IndexEntry, PlayerIndex};
pub use serializer::{CharacterStore, CleanReport, SaveMode, ValidationReport};
pub use stash::{TransientSnapshot, TransientStash};
