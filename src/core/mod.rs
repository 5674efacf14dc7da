pub mod evidence;
pub mod sweep_space;
