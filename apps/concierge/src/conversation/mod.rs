pub mod handlers;
pub mod machine;
pub mod personas;
pub mod session;
