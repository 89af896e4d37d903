use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};

use crate::accounts::AccountStore;
use crate::auth::transport::{self, SessionTransport};
use crate::configuration::{ApplicationSettings, AuthSettings};
use crate::mailer::Mailer;
use crate::middleware::{AuthenticationGate, RequestLogger};
use crate::routes::{
    change_password, check, forgot_password, health_check, login, logout, register,
    reset_password, verify_email,
};

/// Wire the application and start serving.
///
/// The transport strategy is picked here, once, from configuration; the
/// same instance issues tokens in the login handlers and extracts them in
/// the authentication gate, so the two can never run in different modes.
pub fn run(
    listener: TcpListener,
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    application: ApplicationSettings,
    auth: AuthSettings,
) -> Result<Server, std::io::Error> {
    let transport: Arc<dyn SessionTransport> = transport::from_settings(&auth);

    let store_data = web::Data::from(Arc::clone(&store));
    let mailer_data = web::Data::from(mailer);
    let transport_data = web::Data::from(Arc::clone(&transport));
    let application_data = web::Data::new(application);
    let auth_data = web::Data::new(auth.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(store_data.clone())
            .app_data(mailer_data.clone())
            .app_data(transport_data.clone())
            .app_data(application_data.clone())
            .app_data(auth_data.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    // Reachable without a session: the ways in, and the
                    // ways back in after losing a password.
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .route("/forgot-password", web::post().to(forgot_password))
                    .route("/reset-password/{token}", web::post().to(reset_password))
                    // Everything else requires an authenticated principal.
                    .service(
                        web::scope("")
                            .wrap(AuthenticationGate::new(
                                auth.clone(),
                                Arc::clone(&store),
                                Arc::clone(&transport),
                            ))
                            .route("/change-password", web::post().to(change_password))
                            .route("/verify-email/{token}", web::get().to(verify_email))
                            .route("/check", web::get().to(check)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
