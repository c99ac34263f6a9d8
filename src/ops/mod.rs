pub mod ai;
pub mod canvas_ops;
pub mod compositor;
pub mod scripting;
pub mod text;
