use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing logging one line per HTTP request with timing. Server-side
/// failures are promoted to warn so they stand out at the default filter.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| Instant::now());
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let start_time = request.local_cache(|| Instant::now());
        let duration = start_time.elapsed();

        let method = request.method();
        let uri = request.uri();
        let status = response.status();
        let millis = duration.as_secs_f64() * 1000.0;

        if status.code >= 500 {
            log::warn!("{} {} -> {} ({:.2}ms)", method, uri, status.code, millis);
        } else {
            log::info!("{} {} -> {} ({:.2}ms)", method, uri, status.code, millis);
        }
    }
}
