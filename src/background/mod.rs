pub mod session_listener;
