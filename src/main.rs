mod auth;
mod cache;
mod db;
mod errors;
mod handlers;
mod models;
mod utils;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::info;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    // Validate JWT secret
    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    if jwt_secret.is_empty() {
        panic!("JWT_SECRET cannot be empty");
    }

    // Initialize the database pool
    let pool = db::create_pool().await;

    let sessions = web::Data::new(auth::session::SessionState::new());
    let cache = web::Data::new(cache::DepartmentCache::new());

    // One long-lived subscriber logs every auth-state transition.
    let mut auth_events = sessions.subscribe();
    tokio::spawn(async move {
        while auth_events.changed().await.is_ok() {
            let state = *auth_events.borrow();
            info!("Auth state changed: {:?}", state);
        }
    });

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Starting server at {}", bind_addr);

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(sessions.clone())
            .app_data(cache.clone())
            .service(
                web::resource("/")
                    .route(web::get().to(handlers::department::index)),
            )
            .service(
                web::resource("/login")
                    .route(web::get().to(handlers::auth::login_form))
                    .route(web::post().to(handlers::auth::login)),
            )
            .service(
                web::resource("/logout")
                    .route(web::post().to(handlers::auth::logout)),
            )
            .service(
                web::resource("/register")
                    .route(web::post().to(handlers::auth::register)),
            )
            .service(
                web::resource("/department/{department_id}/plo")
                    .route(web::post().to(handlers::department::add_plo))
                    .route(web::patch().to(handlers::department::edit_plo))
                    .route(web::delete().to(handlers::department::delete_plo)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
