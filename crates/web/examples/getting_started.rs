//! A tiny account service.
//!
//! ```text
//! curl -i -c jar http://127.0.0.1:8080/session
//! curl -i -b jar -H 'x-csrf-token: <token>' -d 'email=ada@example.com&role=admin' http://127.0.0.1:8080/login
//! curl -i -b jar http://127.0.0.1:8080/users/1
//! curl -i -b jar http://127.0.0.1:8080/admin
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use http::{Response, StatusCode, header};
use lattice_web::handler::{ControllerAction, controller_method};
use lattice_web::middleware::{csrf_protection, require_role, require_user};
use lattice_web::router::{get, post};
use lattice_web::session::{MemorySessionStore, SESSION_COOKIE, UserIdentity, UserRole, UserSession};
use lattice_web::validator::{Rule, Validator};
use lattice_web::{BoxError, HttpError, RequestContext, ResponseSink, Router, Server};
use serde::Serialize;

struct AccountController {
    sessions: Arc<MemorySessionStore>,
}

#[derive(Serialize)]
struct SessionInfo {
    csrf_token: String,
}

impl AccountController {
    fn start_session(&self, _req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
        let session_id = self.sessions.create();
        let csrf_token = self
            .sessions
            .issue_csrf_token(&session_id)
            .ok_or_else(|| HttpError::internal_server_error("session vanished"))?;

        let body = serde_json::to_vec(&SessionInfo { csrf_token })?;
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .header(header::SET_COOKIE, MemorySessionStore::session_cookie(&session_id))
            .body(body.into())?;
        resp.send(response)?;
        Ok(())
    }

    fn login(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
        let form: HashMap<String, String> = req.form()?;

        let mut validator = Validator::new();
        let rules = [
            ("email", vec![Rule::Required, Rule::Email]),
            ("role", vec![Rule::Optional, Rule::one_of(["admin", "user"])]),
        ];
        if !validator.validate(&form, &rules) {
            return Err(validator.into_http_error("Please correct the highlighted fields").into());
        }

        let session_id = req.cookie(SESSION_COOKIE).ok_or_else(|| HttpError::unauthorized("No session"))?;
        let role = if form.get("role").is_some_and(|role| role == "admin") { UserRole::Admin } else { UserRole::User };
        let user = UserIdentity { id: 1, email: form["email"].clone(), role };

        if !self.sessions.set_user(session_id, user) {
            return Err(HttpError::unauthorized("Session expired").into());
        }
        resp.redirect("/users/1")?;
        Ok(())
    }

    fn show_user(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
        let user = self.sessions.current_user(req).ok_or_else(|| HttpError::unauthorized("Please log in"))?;
        if req.param("id") != Some(user.id.to_string().as_str()) {
            return Err(HttpError::not_found("No such user").into());
        }
        resp.json(StatusCode::OK, &user)?;
        Ok(())
    }

    fn admin(&self, _req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
        resp.text(StatusCode::OK, "welcome to the admin area")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let sessions = Arc::new(MemorySessionStore::new());
    let user_session: Arc<dyn UserSession> = Arc::<MemorySessionStore>::clone(&sessions);

    // a fresh controller per matched request
    let account = |action: ControllerAction<AccountController>| {
        let sessions = Arc::clone(&sessions);
        move || controller_method(AccountController { sessions: Arc::clone(&sessions) }, action)
    };

    let router = Router::builder()
        .route("/session", get(account(AccountController::start_session)))
        .route("/login", post(account(AccountController::login)).with(csrf_protection(Arc::clone(&user_session))))
        .route("/users/[id]", get(account(AccountController::show_user)).with(require_user(Arc::clone(&user_session))))
        .route(
            "/admin",
            get(account(AccountController::admin))
                .with(require_user(Arc::clone(&user_session)))
                .with(require_role(Arc::clone(&user_session), UserRole::Admin)),
        )
        .build();

    Server::builder().router(router).address("127.0.0.1:8080").build().unwrap().start().await;
}
