use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;

use authforge::{
    auth::{RequestGate, SessionAuthority},
    config::Config,
    routes::{self, health},
    store::PgStore,
};

fn fatal(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| fatal("Invalid configuration", e))?;
    // A bad signing key must stop the service before it accepts traffic.
    let codec = config
        .token_codec()
        .map_err(|e| fatal("Cannot build token codec", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| fatal("Failed to connect to database", e))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| fatal("Failed to run migrations", e))?;

    let store = Arc::new(PgStore::new(pool));
    let authority = web::Data::new(SessionAuthority::new(codec, store.clone(), store));

    info!("Starting authforge server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(authority.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(RequestGate)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
