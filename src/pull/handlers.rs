use crate::pose::PosePayload;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::trace;

use super::server::ServerState;

/// Body of a successful pose request
#[derive(Debug, Serialize)]
struct PoseResponse<'a> {
    ok: bool,
    updated_ms: i64,
    pose: &'a PosePayload,
}

/// Answers preflight requests and stamps every response with a permissive origin
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        trace!("CORS preflight for {}", request.uri().path());
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("600"),
        );
        return response;
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Handler for health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// Latest pose snapshot, or 503 until the first detection lands
pub async fn pose_handler(State(state): State<ServerState>) -> Response {
    let snapshot = state.store.get();

    match (snapshot.payload, snapshot.updated_ms) {
        (Some(payload), Some(updated_ms)) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Json(PoseResponse {
                ok: true,
                updated_ms,
                pose: payload.as_ref(),
            }),
        )
            .into_response(),
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "No pose data yet" })),
        )
            .into_response(),
    }
}

pub async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Not Found",
            "path": uri.path(),
        })),
    )
}

/// Small page that polls the pose route and draws the skeleton
pub async fn viewer_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let html = format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Avatar Relay Pose</title>
    <style>
        :root {{ color-scheme: dark; }}
        body {{
            margin: 0;
            background: #111;
            color: #ccc;
            font-family: monospace;
            display: flex;
            flex-direction: column;
            align-items: center;
        }}
        canvas {{ background: #000; margin-top: 1rem; }}
    </style>
</head>
<body>
    <canvas id="pose" width="640" height="480"></canvas>
    <p id="status">waiting for pose data</p>
    <script>
        const canvas = document.getElementById("pose");
        const ctx = canvas.getContext("2d");
        const status = document.getElementById("status");

        async function poll() {{
            try {{
                const res = await fetch("{path}", {{ cache: "no-store" }});
                const body = await res.json();
                if (!res.ok) {{
                    status.textContent = body.error || res.status;
                    return;
                }}
                draw(body.pose);
                status.textContent = "updated " + new Date(body.updated_ms).toLocaleTimeString();
            }} catch (err) {{
                status.textContent = "offline";
            }}
        }}

        function draw(pose) {{
            const w = canvas.width, h = canvas.height;
            ctx.clearRect(0, 0, w, h);
            ctx.strokeStyle = "#4af";
            ctx.lineWidth = 3;
            for (const seg of Object.values(pose.segments)) {{
                ctx.beginPath();
                ctx.moveTo(seg.start_point.x * w, seg.start_point.y * h);
                ctx.lineTo(seg.end_point.x * w, seg.end_point.y * h);
                ctx.stroke();
            }}
            ctx.fillStyle = "#fa4";
            for (const lm of Object.values(pose.landmarks)) {{
                ctx.globalAlpha = Math.max(0.2, lm.visibility);
                ctx.fillRect(lm.x * w - 2, lm.y * h - 2, 4, 4);
            }}
            ctx.globalAlpha = 1;
        }}

        setInterval(poll, 100);
    </script>
</body>
</html>
"##,
        path = state.pose_path,
    );

    Html(html)
}
