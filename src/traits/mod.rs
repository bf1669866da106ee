mod connections;
mod users;

pub use connections::{Connection, ConnectionPatch, ConnectionStore, NewConnection, RankedPage};
pub use users::{NewUser, ProfilePatch, User, UserStore};
