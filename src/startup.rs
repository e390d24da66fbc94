use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthService;
use crate::configuration::Platform;
use crate::middleware::{JwtMiddleware, LoggerMiddleware};
use crate::routes::{get_current_user, health_check, login, refresh, register, reset, revoke};

pub fn run(
    listener: TcpListener,
    auth: AuthService,
    platform: Platform,
) -> Result<Server, std::io::Error> {
    let jwt_config = auth.jwt_settings().clone();
    let auth = web::Data::new(auth);
    let platform = web::Data::new(platform);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(auth.clone())
            .app_data(platform.clone())

            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    .route("/users", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    // Routes behind an access token
                    .service(
                        web::scope("/users/me")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route("", web::get().to(get_current_user)),
                    ),
            )
            .route("/admin/reset", web::post().to(reset))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
