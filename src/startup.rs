use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, guard, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;

use crate::error::AppError;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_user, health_check, login, polka_webhook, refresh, revoke, update_user,
};
use crate::session::SessionService;

/// Mount the authentication endpoints under `/api`
///
/// `PUT /api/users` is the access-token protected resource; the guarded
/// resources let POST and PUT share the path with different middleware.
pub fn configure(
    session: web::Data<SessionService>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(
            web::scope("/api")
                .route("/healthz", web::get().to(health_check))
                .service(
                    web::resource("/users")
                        .guard(guard::Post())
                        .route(web::post().to(create_user)),
                )
                .service(
                    web::resource("/users")
                        .guard(guard::Put())
                        .wrap(JwtMiddleware::new(session))
                        .route(web::put().to(update_user)),
                )
                .route("/login", web::post().to(login))
                .route("/refresh", web::post().to(refresh))
                .route("/revoke", web::post().to(revoke))
                .route("/polka/webhooks", web::post().to(polka_webhook)),
        );
    }
}

/// Body decoding errors must not echo serde's message back to the client.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        tracing::warn!(error = %err, "Rejected non-conforming JSON body");
        AppError::InputMalformed("non-conforming JSON received".to_string()).into()
    })
}

pub fn run(listener: TcpListener, session: SessionService) -> Result<Server, std::io::Error> {
    let session = web::Data::new(session);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(session.clone())
            .app_data(json_config())
            .configure(configure(session.clone()))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
