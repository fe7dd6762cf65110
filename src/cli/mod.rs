mod chat;
mod remind;
mod user;

pub use chat::chat;
pub use remind::remind_check;
pub use user::{user_create, user_show};
