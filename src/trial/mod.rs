pub mod aggregate;
pub mod engine;
pub mod events;
pub mod gate;
pub mod ghost;
pub mod motor;
pub mod push;
pub mod scheduler;
pub mod sweep;
