mod auth;
pub use auth::test_password;
