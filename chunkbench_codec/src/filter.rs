//! Built-in filters.
//!
//! | Identifier | Name            | Filter                                      |
//! |------------|-----------------|---------------------------------------------|
//! | 3          | `fletcher32`    | [`Fletcher32Filter`](fletcher32::Fletcher32Filter) |
//! | 400        | `passthrough`   | [`PassthroughFilter`](passthrough::PassthroughFilter) |

pub mod fletcher32;
pub mod passthrough;
