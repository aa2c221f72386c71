use rocket::Route;

pub mod campaign;
pub mod device;
pub mod device_schedule;
pub mod live_relay;
pub mod play_counts;
pub mod status;

/// Every API route, mounted under `/api`.
pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(status::routes());
    routes.extend(device::routes());
    routes.extend(campaign::routes());
    routes.extend(device_schedule::routes());
    routes.extend(live_relay::routes());
    routes.extend(play_counts::routes());
    routes
}
