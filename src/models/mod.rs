pub mod quality;
pub mod scheduling_state;
pub mod sm2;

pub use quality::Quality;
pub use scheduling_state::{
    CardId, CardSchedulingState, DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR, Versioned,
};
