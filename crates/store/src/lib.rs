// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pg-store: the Metadata Store (spec §4.1). One JSON file per entity
//! collection under a single metadata directory, written with
//! write-temp-then-rename, guarded by an in-process `RwLock` per
//! collection. There is exactly one writer process per directory — no
//! cross-process locking, no WAL.

mod collection;
mod entities;
mod error;
mod store;

pub use collection::{Collection, HasId};
pub use entities::user_keyed_uuid;
pub use error::{StoreError, StoreResult};
pub use store::Store;
