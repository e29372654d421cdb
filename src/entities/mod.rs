mod location;
mod place;
mod user;

pub use location::Coordinates;
pub use place::{Place, DEFAULT_PLACE_IMAGE};
pub use user::{User, UserView, DEFAULT_USER_IMAGE};
