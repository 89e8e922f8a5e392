/// Data layer: core types, loading, row filtering and export.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file + sheet → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  ordered Vec<Column>, tagged cells
///   └──────────┘
///        │
///        ├──▶ filter   row masks for drop / subsample operations
///        ▼
///   ┌──────────┐
///   │  export   │  Table → .xlsx / .csv / .json / .parquet
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
