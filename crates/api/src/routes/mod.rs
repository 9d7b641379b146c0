mod misc;
mod stripe;

pub use misc::misc_routes;
pub use stripe::stripe_routes;
