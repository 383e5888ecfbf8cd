pub mod lenient;
pub mod persona;
pub mod recommendation;
