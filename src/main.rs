// main.rs
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use dotenv::dotenv;

mod controllers;
mod db;
mod ingest;
mod models;
mod store;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("starting up...");
    let pool = match db::establish_connection().await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Gagal inisialisasi pool database: {:?}", e);
            std::process::exit(1);
        }
    };

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .supports_credentials()
            .max_age(3600);

        // File xlsx dibuffer penuh di memori sebelum diparse
        let payload_config = web::PayloadConfig::new(20 * 1024 * 1024).limit(20 * 1024 * 1024);

        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(payload_config)
            .wrap(cors)
            .wrap(Logger::default())
            //upload
            .service(controllers::upload_controller::upload_ptk)
            //dashboard
            .service(controllers::dashboard_controller::get_dashboard)
            .service(controllers::dashboard_controller::get_kecamatan_options)
    })
    .bind(("127.0.0.1", 8000))?
    .run()
    .await
}
