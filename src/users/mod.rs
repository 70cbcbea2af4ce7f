//! Identity persistence.

#[cfg(test)]
pub(crate) mod memory;
mod model;
mod postgres;
mod store;

pub use model::{NewUser, User, UserPayload};
pub use postgres::PgUserStore;
pub use store::{StoreError, UserStore};
