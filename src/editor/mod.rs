mod danger;
mod segmenter;

pub use danger::*;
pub use segmenter::*;
