mod builder;
mod dsl;

pub use builder::{OrderDirection, Query, QuerySpec, RankSpec};
pub use dsl::QueryDef;
