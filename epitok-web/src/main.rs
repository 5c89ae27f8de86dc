//! Servidor web Axum para tokenização interativa de inscrições EpiDoc
//!
//! | Rota               | Uso                                                   |
//! |--------------------|-------------------------------------------------------|
//! | `GET /`            | página de demonstração                                |
//! | `POST /tokenize`   | `{xml, insert_spaces?, edition_only?}` → XML + relatório |
//! | `GET /ws`          | mesmo pedido via WebSocket, com um evento por contêiner |
//! | `GET /demo-texts`  | inscrições de exemplo                                 |
//! | `GET /health`      | verificação de vida                                   |

use std::sync::{mpsc, Arc};
use std::time::Instant;

use askama::Template;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use epitok_core::{
    config::{Loader, TokenizerConfig},
    corpus::demo_texts,
    DocumentReport, PipelineEvent, Tokenizer,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Estado compartilhado da aplicação: as opções padrão do tokenizador.
struct AppState {
    defaults: TokenizerConfig,
}

impl AppState {
    /// Opções do pedido por cima das opções padrão.
    fn tokenizer(&self, insert_spaces: Option<bool>, edition_only: Option<bool>) -> Tokenizer {
        Tokenizer::with_config(TokenizerConfig {
            insert_spaces: insert_spaces.unwrap_or(self.defaults.insert_spaces),
            edition_only: edition_only.unwrap_or(self.defaults.edition_only),
        })
    }
}

/// Corpo de `POST /tokenize` e das mensagens do WebSocket.
#[derive(Deserialize)]
struct TokenizeRequest {
    xml: String,
    #[serde(default)]
    insert_spaces: Option<bool>,
    #[serde(default)]
    edition_only: Option<bool>,
}

#[derive(Serialize)]
struct TokenizeResponse {
    xml: String,
    report: DocumentReport,
    processing_ms: u64,
}

struct Demo {
    title: &'static str,
    xml: &'static str,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    demos: Vec<Demo>,
    first: &'static str,
    insert_spaces: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("EPITOK_CONFIG").unwrap_or_else(|_| "epitok.toml".to_string());
    let config = Loader::new().with_optional_file(&config_path).build()?;
    let state = Arc::new(AppState {
        defaults: config.tokenizer,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.address).await?;
    info!("servidor epitok iniciado em http://{}", config.server.address);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/tokenize", post(tokenize_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Página principal
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let demos: Vec<Demo> = demo_texts()
        .into_iter()
        .map(|(title, xml)| Demo { title, xml })
        .collect();
    let first = demos.first().map_or("", |d| d.xml);
    let page = IndexTemplate {
        demos,
        first,
        insert_spaces: state.defaults.insert_spaces,
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!(error = %err, "failed to render index");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Tokenização via HTTP POST (sem streaming)
async fn tokenize_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenizeRequest>,
) -> Response {
    if req.xml.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "XML vazio"})),
        )
            .into_response();
    }

    let tokenizer = state.tokenizer(req.insert_spaces, req.edition_only);
    let start = Instant::now();
    // a tokenização é síncrona: roda fora do runtime
    let result = tokio::task::spawn_blocking(move || tokenizer.tokenize_str(&req.xml)).await;

    match result {
        Ok(Ok((xml, report))) => Json(TokenizeResponse {
            xml,
            report,
            processing_ms: start.elapsed().as_millis() as u64,
        })
        .into_response(),
        Ok(Err(err)) => {
            warn!(error = %err, "tokenization rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": err.to_string()})),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "tokenization task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Retorna as inscrições de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(title, xml)| {
            serde_json::json!({
                "title": title,
                "xml": xml
            })
        })
        .collect();
    Json(texts)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Recebe um documento, tokeniza e envia um evento por contêiner
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // JSON {xml, insert_spaces?, edition_only?}; senão o texto é o próprio XML
                let req = serde_json::from_str::<TokenizeRequest>(&text).unwrap_or_else(|_| TokenizeRequest {
                    xml: text.to_string(),
                    insert_spaces: None,
                    edition_only: None,
                });
                if req.xml.trim().is_empty() {
                    continue;
                }
                info!("tokenizando via WebSocket: {} bytes", req.xml.len());

                let tokenizer = state.tokenizer(req.insert_spaces, req.edition_only);
                let handle = tokio::task::spawn_blocking(move || {
                    let (tx, rx) = mpsc::channel::<PipelineEvent>();
                    match epitok_core::xml::parse(&req.xml) {
                        Ok(mut doc) => tokenizer.tokenize_document_streaming(&mut doc, tx),
                        Err(err) => {
                            let _ = tx.send(PipelineEvent::Error {
                                message: err.to_string(),
                            });
                        }
                    }
                    rx.try_iter().collect::<Vec<_>>()
                });

                let events = match handle.await {
                    Ok(events) => events,
                    Err(err) => {
                        error!(error = %err, "tokenization task failed");
                        return;
                    }
                };
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(Arc::new(AppState {
            defaults: TokenizerConfig {
                insert_spaces: false,
                edition_only: false,
            },
        }))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_tokenize_endpoint() {
        let request = post_json(
            "/tokenize",
            serde_json::json!({"xml": "<ab>a·b</ab>", "insert_spaces": true}),
        );
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["xml"],
            "<ab><w>a</w><g ref=\"#interpunct\">·</g> <w>b</w></ab>"
        );
        assert_eq!(body["report"]["dividers"], 1);
    }

    #[tokio::test]
    async fn test_empty_xml_is_bad_request() {
        let request = post_json("/tokenize", serde_json::json!({"xml": "  "}));
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_xml_is_unprocessable() {
        let request = post_json("/tokenize", serde_json::json!({"xml": "<ab>a</l>"}));
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("mismatched"));
    }

    #[tokio::test]
    async fn test_demo_texts_and_health() {
        let response = test_app()
            .oneshot(Request::get("/demo-texts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), demo_texts().len());

        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_renders_demos() {
        let response = test_app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Epitáfio"));
        // o XML dos exemplos sai escapado
        assert!(!html.contains("<ab>"));
    }
}
