//! Bearer-token extraction middleware, grounded on
//! `server/middleware/jwt_auth.rs::jwt_auth_middleware`.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::state::{AppState, AuthenticatedAgent};

pub async fn auth_middleware(State(state): State<AppState>, mut request: Request<Body>, next: Next) -> Response {
    if let Some(agent) = extract_agent(&request, &state) {
        request.extensions_mut().insert(agent);
    }

    next.run(request).await
}

fn extract_agent(request: &Request<Body>, state: &AppState) -> Option<AuthenticatedAgent> {
    let header = request.headers().get(axum::http::header::AUTHORIZATION)?;
    let raw = header.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);

    let claims = state.jwt.verify(token).ok()?;
    Some(AuthenticatedAgent { agent_id: claims.agent_id, scopes: claims.scopes })
}
