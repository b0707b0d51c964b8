mod activity;
mod assignment;
mod category;
mod project;
mod role;
mod settings;
mod task;
mod user;

pub use activity::*;
pub use assignment::*;
pub use category::*;
pub use project::*;
pub use role::*;
pub use settings::*;
pub use task::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field from an explicit `null` in partial updates:
/// missing stays `None`, `null` becomes `Some(None)`, a value `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
