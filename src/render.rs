pub mod canvas;
pub mod compositor;
