use rocket::{Build, Rocket};

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    lms_api_server::rocket()
}
