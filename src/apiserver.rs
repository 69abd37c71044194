// apiserver.rs

use askama::Template;
use axum::{
    Json, Router,
    body::Body,
    extract::{Form, State},
    http::{Response, StatusCode, header},
    response::{Html, IntoResponse, Redirect},
    routing::*,
};
pub use axum_macros::debug_handler;
use tower_http::trace::TraceLayer;

use crate::*;

pub fn api_router(state: Arc<MyState>) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/styles.css", get(get_styles))
        .route("/settings", get(get_settings).post(post_settings))
        .route("/setpoint", post(post_setpoint))
        .route("/temp", get(get_temp))
        .route("/config", get(get_config).options(options))
        .route("/reset_config", get(reset_config))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_api_server(state: Arc<MyState>, addr: net::SocketAddr) -> anyhow::Result<()> {
    let app = api_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening to {addr}");
    Ok(axum::serve(listener, app.into_make_service()).await?)
}

pub async fn options(State(state): State<Arc<MyState>>) -> Response<Body> {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} options()");

    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "get"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type"),
        ],
    )
        .into_response()
}

fn render_page<T: Template>(page: &T, what: &str) -> Response<Body> {
    match page.render() {
        Ok(s) => (StatusCode::OK, Html(s)).into_response(),
        Err(e) => {
            let err_msg = format!("{what} template error: {e:?}\n");
            error!("{err_msg}");
            (StatusCode::INTERNAL_SERVER_ERROR, err_msg).into_response()
        }
    }
}

pub async fn get_index(State(state): State<Arc<MyState>>) -> Response<Body> {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} get_index()");

    let values = match state.controller.readings().await {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("Controller read error: {e:?}");
            error!("{msg}");
            return (StatusCode::BAD_GATEWAY, msg).into_response();
        }
    };
    render_page(&IndexPage::new(&values, &state.started), "Index")
}

pub async fn get_settings(State(state): State<Arc<MyState>>) -> Response<Body> {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} get_settings()");

    render_page(&state.settings.get().await, "Settings")
}

pub async fn get_styles(State(state): State<Arc<MyState>>) -> Response<Body> {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} get_styles()");

    let styles = include_bytes!("styles.css");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        styles.to_vec(),
    )
        .into_response()
}

pub async fn get_temp(State(state): State<Arc<MyState>>) -> Response<Body> {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} get_temp()");

    match state.controller.readings().await {
        Ok(v) => (StatusCode::OK, Json(v)).into_response(),
        Err(e) => {
            let msg = format!("Controller read error: {e:?}");
            error!("{msg}");
            (StatusCode::BAD_GATEWAY, msg).into_response()
        }
    }
}

pub async fn get_config(State(state): State<Arc<MyState>>) -> (StatusCode, Json<WebSettings>) {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} get_config()");
    (StatusCode::OK, Json(state.settings.get().await))
}

#[debug_handler]
pub async fn post_settings(
    State(state): State<Arc<MyState>>,
    Form(form): Form<UpdateSettings>,
) -> Response<Body> {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} post_settings()");

    let (Some(host), Some(port), Some(logfile)) = (form.host, form.port, form.logfile) else {
        let msg = "Settings form error: host, port and logfile are required".to_string();
        error!("{msg}");
        return (StatusCode::BAD_REQUEST, msg).into_response();
    };

    // no radio selected keeps the current unit
    let units = match form.units.as_deref().map(str::parse::<TempUnit>).transpose() {
        Ok(u) => u,
        Err(e) => {
            let msg = format!("Settings form error: {e}");
            error!("{msg}");
            return (StatusCode::BAD_REQUEST, msg).into_response();
        }
    };
    let port = match port.trim().parse::<u16>() {
        Ok(p) => p,
        Err(e) => {
            let msg = format!("Settings form error: port {port:?}: {e}");
            error!("{msg}");
            return (StatusCode::BAD_REQUEST, msg).into_response();
        }
    };

    info!("Saving new settings...");
    let res = state
        .settings
        .update(|s| {
            if let Some(u) = units {
                s.units = u;
            }
            s.host = host.trim().to_string();
            s.port = port;
            s.logfile = logfile.trim().to_string();
        })
        .await;

    match res {
        Ok(_) => Redirect::to("/settings").into_response(),
        Err(e) => {
            let msg = format!("Settings write error: {e}");
            error!("{msg}");
            (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
        }
    }
}

pub async fn post_setpoint(
    State(state): State<Arc<MyState>>,
    Form(form): Form<UpdateSetpoint>,
) -> Response<Body> {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} post_setpoint()");

    let value = match form.setpoint.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            let msg = format!("Setpoint form error: {:?} is not a number", form.setpoint);
            error!("{msg}");
            return (StatusCode::BAD_REQUEST, msg).into_response();
        }
    };

    match state.controller.put_setpoint(value).await {
        Ok(k) => {
            info!("Setpoint {} K sent to controller.", k.0);
            Redirect::to("/").into_response()
        }
        Err(e) => {
            let msg = format!("Controller write error: {e:?}");
            error!("{msg}");
            (StatusCode::BAD_GATEWAY, msg).into_response()
        }
    }
}

pub async fn reset_config(State(state): State<Arc<MyState>>) -> (StatusCode, String) {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    info!("#{cnt} reset_config()");

    info!("Saving default settings...");
    match state.settings.reset().await {
        Ok(_) => (StatusCode::OK, "OK".to_string()),
        Err(e) => {
            let msg = format!("Settings write error: {e}");
            error!("{msg}");
            (StatusCode::INTERNAL_SERVER_ERROR, msg)
        }
    }
}


// EOF
