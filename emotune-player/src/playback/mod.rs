//! Crossfade scheduling: volume ramps, the repeating timer, and the scheduler

pub mod fade;
pub mod scheduler;
pub mod timer;

pub use fade::{FadeDirection, FadeParams, FadeStep};
pub use scheduler::CrossfadeScheduler;
pub use timer::RepeatingTask;
