use axum::{
    routing::{get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::booking::{register_booking, relocate_booking, show_current_booking};

pub fn build_booking_routers() -> Router<AppRegistry> {
    let booking_routers = Router::new()
        .route("/", get(show_current_booking))
        .route("/", post(register_booking))
        .route("/:booking_id", put(relocate_booking));

    Router::new().nest("/booking", booking_routers)
}
