pub mod crop;
pub mod dates;
pub mod field;
pub mod normalize;
pub mod progress;
pub mod task;
pub mod view;
pub mod window;
