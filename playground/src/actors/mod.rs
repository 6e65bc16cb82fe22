pub mod session_actor;
