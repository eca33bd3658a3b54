pub mod compositor;
