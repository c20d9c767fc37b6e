pub mod channel;
pub mod throttle;

pub use channel::{StateChannel, Subscription};
pub use throttle::throttle;
