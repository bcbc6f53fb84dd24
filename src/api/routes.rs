//! Route table
//!
//! Everything except `/health` and `/api/auth/login` requires a bearer token;
//! role checks live in the handlers.

use actix_web::{error::JsonPayloadError, error::QueryPayloadError, web, HttpRequest};

use super::handlers::{
    admissions, appointments, auth, billing, dashboard, facilities, health, lab, patients, pharmacy, radiology,
    users,
};
use crate::error::ApiError;

const JSON_LIMIT_BYTES: usize = 256 * 1024;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("invalid JSON body: {}", err)).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("invalid query string: {}", err)).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT_BYTES).error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(|err, _req| {
            ApiError::BadRequest(format!("invalid path parameter: {}", err)).into()
        }))
        .route("/health", web::get().to(health::health))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .route("/login", web::post().to(auth::login))
                        .route("/me", web::get().to(auth::me))
                        .route("/change-password", web::post().to(auth::change_password)),
                )
                .service(
                    web::scope("/users")
                        .route("", web::get().to(users::list))
                        .route("", web::post().to(users::create))
                        .route("/{id}", web::get().to(users::get))
                        .route("/{id}", web::put().to(users::update))
                        .route("/{id}", web::delete().to(users::deactivate)),
                )
                .route("/doctors", web::get().to(users::list_doctors))
                .service(
                    web::scope("/departments")
                        .route("", web::get().to(facilities::list_departments))
                        .route("", web::post().to(facilities::create_department))
                        .route("/{id}", web::put().to(facilities::update_department))
                        .route("/{id}", web::delete().to(facilities::delete_department)),
                )
                .service(
                    web::scope("/wards")
                        .route("", web::get().to(facilities::list_wards))
                        .route("", web::post().to(facilities::create_ward))
                        .route("/{id}", web::get().to(facilities::get_ward))
                        .route("/{id}/beds", web::get().to(facilities::list_ward_beds))
                        .route("/{id}/beds", web::post().to(facilities::add_bed)),
                )
                .service(
                    web::scope("/beds")
                        .route("", web::get().to(facilities::list_beds))
                        .route("/{id}", web::delete().to(facilities::delete_bed)),
                )
                .service(
                    web::scope("/patients")
                        .route("", web::get().to(patients::search))
                        .route("", web::post().to(patients::register))
                        .route("/{id}", web::get().to(patients::get))
                        .route("/{id}", web::put().to(patients::update))
                        .route("/{id}", web::delete().to(patients::delete))
                        .route("/{id}/history", web::get().to(patients::history)),
                )
                .service(
                    web::scope("/admissions")
                        .route("", web::get().to(admissions::list))
                        .route("", web::post().to(admissions::admit))
                        .route("/{id}", web::get().to(admissions::get))
                        .route("/{id}/discharge", web::post().to(admissions::discharge))
                        .route("/{id}/transfer", web::post().to(admissions::transfer)),
                )
                .service(
                    web::scope("/lab-tests")
                        .route("", web::get().to(lab::list))
                        .route("", web::post().to(lab::order))
                        .route("/{id}", web::get().to(lab::get))
                        .route("/{id}/collect", web::post().to(lab::collect))
                        .route("/{id}/result", web::post().to(lab::record_result))
                        .route("/{id}/cancel", web::post().to(lab::cancel)),
                )
                .service(
                    web::scope("/radiology-scans")
                        .route("", web::get().to(radiology::list))
                        .route("", web::post().to(radiology::order))
                        .route("/{id}", web::get().to(radiology::get))
                        .route("/{id}/report", web::post().to(radiology::report))
                        .route("/{id}/cancel", web::post().to(radiology::cancel)),
                )
                .service(
                    web::scope("/medicines")
                        .route("", web::get().to(pharmacy::list_medicines))
                        .route("", web::post().to(pharmacy::create_medicine))
                        .route("/{id}", web::put().to(pharmacy::update_medicine))
                        .route("/{id}/restock", web::post().to(pharmacy::restock)),
                )
                .service(
                    web::scope("/prescriptions")
                        .route("", web::get().to(pharmacy::list_prescriptions))
                        .route("", web::post().to(pharmacy::create_prescription))
                        .route("/{id}", web::get().to(pharmacy::get_prescription))
                        .route("/{id}/dispense", web::post().to(pharmacy::dispense))
                        .route("/{id}/cancel", web::post().to(pharmacy::cancel_prescription)),
                )
                .service(
                    web::scope("/bills")
                        .route("", web::get().to(billing::list))
                        .route("", web::post().to(billing::create))
                        .route("/{id}", web::get().to(billing::get))
                        .route("/{id}/items", web::post().to(billing::add_items))
                        .route("/{id}/payments", web::post().to(billing::add_payment))
                        .route("/{id}/void", web::post().to(billing::void)),
                )
                .service(
                    web::scope("/appointments")
                        .route("", web::get().to(appointments::list))
                        .route("", web::post().to(appointments::create))
                        .route("/{id}", web::get().to(appointments::get))
                        .route("/{id}/reschedule", web::post().to(appointments::reschedule))
                        .route("/{id}/cancel", web::post().to(appointments::cancel))
                        .route("/{id}/complete", web::post().to(appointments::complete))
                        .route("/{id}/no-show", web::post().to(appointments::no_show)),
                )
                .route("/dashboard", web::get().to(dashboard::stats)),
        );
}
