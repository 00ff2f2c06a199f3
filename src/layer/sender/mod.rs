mod policy;
mod rtt;
mod sender;

pub use policy::*;
pub use rtt::*;
pub use sender::*;
