/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → BaseTable (price > 0 only), memoized by path
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ BaseTable │  Vec<Listing>, sorted region index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  region + price window → FilteredView (row indices)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  metrics │ histogram │ group summary
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
