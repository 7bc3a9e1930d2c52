pub mod github;
pub mod posts;
pub mod profiles;
pub mod tokens;
pub mod users;
