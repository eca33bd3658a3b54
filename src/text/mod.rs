pub mod fit;
pub mod font;
