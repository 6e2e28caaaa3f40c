mod tunnel;

pub use tunnel::{TunnelInfo, TunnelListing};
