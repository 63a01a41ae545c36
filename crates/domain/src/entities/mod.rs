pub mod range_position;
pub mod swap_event;

pub use range_position::{RangePosition, TickRange};
pub use swap_event::{SwapEvent, SwapSide};
