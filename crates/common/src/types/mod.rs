use serde::{Deserialize, Serialize};

mod flags;
mod project;

pub use flags::ProjectFlags;
pub use project::{Project, User};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}
