pub mod correlate;
pub mod normalize;
