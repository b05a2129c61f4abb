pub mod errors;
pub mod memo_store;
pub mod process_index;
pub mod unit_store;

pub use errors::{StoreError, StoreResult};
pub use memo_store::{Memo, MemoStore};
pub use process_index::ProcessIndex;
pub use unit_store::{MemoryUnitStore, UnitRecord, UnitStore, UnitStoreReader};
