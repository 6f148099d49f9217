//! Domain types shared by the store, the auth layer and the HTTP handlers.

pub mod location;
pub mod score;
pub mod user;

pub use location::{Coordinates, Location};
pub use score::ScoreRecord;
pub use user::{KeyOwner, User, UserId};
