pub mod decode;
pub mod discover;
pub mod encode;
pub mod font;
