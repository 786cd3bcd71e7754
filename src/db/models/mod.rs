mod assessment;
mod invitation;
mod magic_link;
mod user;

pub use assessment::*;
pub use invitation::*;
pub use magic_link::*;
pub use user::*;
