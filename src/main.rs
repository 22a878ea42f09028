use actix_cors::Cors;
use actix_web::{
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use codestash::{config::Config, db, middleware::jwt_middleware::ExtractIdentity, routes, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::from_filename(".env").or_else(|_| dotenv::dotenv()).ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load();

    let pool = db::connection_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Error building a connection pool");

    db::init_schema(&pool, &config.database_url)
        .await
        .expect("Error creating the database schema");

    let app_data = Data::new(AppState::new(
        pool,
        config.jwt_access_secret.clone(),
        config.jwt_refresh_secret.clone(),
    ));

    let identity = ExtractIdentity::new(app_data.clone());

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(app_data.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .service(
                web::scope("/api")
                    .configure(routes::auth_routes::config)
                    .configure(|cfg| routes::snippet_routes::config(cfg, identity.clone())),
            )
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await
}
