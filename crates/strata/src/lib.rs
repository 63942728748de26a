//! # strata
//!
//! Public facade for the Strata record layer. Downstream projects depend
//! on this crate; the engine lives in `strata-core` and is re-exported
//! here module by module.
//!
//! A store is assembled from four collaborators (an ordered KV store, a
//! record codec, registered record metadata, and optionally statistics
//! and a rank set) and then queried declaratively:
//!
//! ```ignore
//! use strata::prelude::*;
//!
//! let store = RecordStore::new(prefix, kv, codec, metadata);
//! let users = store
//!     .fetch_all(&store.query("User").filter(Predicate::eq("city", "Tokyo")).build())
//!     .await?;
//! ```

pub use strata_core::prelude;

pub use strata_core::{
    MAX_INDEX_COLUMNS, aggregate, cursor, error, kv, model, plan, predicate, primitives, query,
    stats, store, tuple,
};
