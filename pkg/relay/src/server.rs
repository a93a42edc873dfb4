//! `POST /execute` forwards a signed action to the pool and answers with the transaction hash,
//! or with the decoded revert when the node rejects it.

use std::sync::Arc;

use actix_web::{
    http::{Method, StatusCode},
    web, App, HttpResponse, HttpResponseBuilder, HttpServer,
};
use contracts::{
    revert::{build_revert_debug, error_graph},
    RevertDebug, SelectorTable,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::ActionExecutor;

/// Pool functions the relay pays gas for
pub const ALLOWED_FUNCTIONS: [&str; 2] = ["withdraw", "withdrawV2b"];

const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "POST, OPTIONS"),
    ("access-control-allow-headers", "content-type"),
];

/// Shared by every worker; read-only after start-up
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn ActionExecutor>,
    pub selectors: Arc<SelectorTable>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/execute")
            .route(web::post().to(execute))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(not_found)),
    )
    .default_service(web::to(not_found));
}

pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(("0.0.0.0", port))?;

    info!(port, "relay listening");
    server.run().await
}

fn with_cors(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    for header in CORS_HEADERS {
        builder.insert_header(header);
    }
    builder
}

fn json_response(status: StatusCode, body: Value) -> HttpResponse {
    with_cors(&mut HttpResponse::build(status)).json(body)
}

async fn preflight() -> HttpResponse {
    with_cors(&mut HttpResponse::NoContent()).finish()
}

async fn not_found() -> HttpResponse {
    json_response(StatusCode::NOT_FOUND, json!({ "error": "Not found" }))
}

/// A body that is not JSON is taken as a plain string, which never carries an action
fn signed_action(body: &[u8]) -> Option<Value> {
    let payload = serde_json::from_slice::<Value>(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));

    match payload.get("signedAction") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(action) => Some(action.clone()),
    }
}

async fn execute(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    if body.is_empty() {
        return json_response(StatusCode::BAD_REQUEST, json!({ "error": "Empty body" }));
    }

    let Some(signed_action) = signed_action(&body) else {
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "No signedAction present in body" }),
        );
    };

    match signed_action.get("functionName").and_then(Value::as_str) {
        Some(name) if ALLOWED_FUNCTIONS.contains(&name) => {}
        Some(name) => {
            warn!(function = name, "refusing signed action");
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Function not allowed: {name}") }),
            );
        }
        None => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "No functionName in signedAction" }),
            );
        }
    }

    info!(%signed_action, "executing signed action");

    match state.executor.execute(&signed_action).await {
        Ok(tx_hash) => {
            info!(?tx_hash, "action submitted");
            json_response(StatusCode::OK, json!({ "txHash": format!("{tx_hash:?}") }))
        }
        Err(err) => {
            error!(%err, "action failed");

            let mut body = json!({ "error": err.to_string() });
            if let Some(debug) = revert_debug(&err, &state.selectors) {
                body["debug"] = json!(debug);
            }

            json_response(StatusCode::INTERNAL_SERVER_ERROR, body)
        }
    }
}

fn revert_debug(err: &contracts::Error, selectors: &SelectorTable) -> Option<RevertDebug> {
    match err {
        contracts::Error::Revert {
            debug: Some(debug), ..
        } => Some(debug.clone()),
        err => build_revert_debug(&error_graph(err), selectors),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use actix_web::{http::header::HeaderMap, test};
    use async_trait::async_trait;
    use contracts::{selectors::selector, H256};
    use web3::ethabi::{self, Token};

    use super::*;

    /// Answers every action with the result of a closure
    pub(crate) struct FnExecutor<F>(pub F);

    #[async_trait]
    impl<F> ActionExecutor for FnExecutor<F>
    where
        F: Fn(&Value) -> contracts::Result<H256> + Send + Sync,
    {
        async fn execute(&self, signed_action: &Value) -> contracts::Result<H256> {
            (self.0)(signed_action)
        }
    }

    pub(crate) fn selectors() -> SelectorTable {
        SelectorTable::from_abi(&json!([
            { "type": "error", "name": "Foo", "inputs": [{ "type": "uint256" }] },
            { "type": "error", "name": "Paused", "inputs": [] },
        ]))
        .unwrap()
    }

    pub(crate) fn state(executor: impl ActionExecutor + 'static) -> web::Data<AppState> {
        web::Data::new(AppState {
            executor: Arc::new(executor),
            selectors: Arc::new(selectors()),
        })
    }

    fn revert(message: String) -> contracts::Result<H256> {
        Err(contracts::Error::Revert {
            message,
            debug: None,
        })
    }

    const WITHDRAW_ACTION: &str = r#"{"signedAction":{"functionName":"withdrawV2b"}}"#;

    fn foo_payload() -> String {
        format!("0x{}{:064x}", hex::encode(selector("Foo(uint256)")), 7)
    }

    async fn call(
        executor: impl ActionExecutor + 'static,
        req: test::TestRequest,
    ) -> (StatusCode, HeaderMap, web::Bytes) {
        let app =
            test::init_service(App::new().app_data(state(executor)).configure(routes)).await;

        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = test::read_body(resp).await;

        (status, headers, body)
    }

    async fn post(executor: impl ActionExecutor + 'static, body: &str) -> (StatusCode, Value) {
        let req = test::TestRequest::post()
            .uri("/execute")
            .set_payload(body.to_owned());
        let (status, headers, body) = call(executor, req).await;

        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");

        (status, serde_json::from_slice(&body).unwrap())
    }

    fn unreachable_executor() -> impl ActionExecutor {
        FnExecutor(|_: &Value| -> contracts::Result<H256> {
            panic!("executor must not be called")
        })
    }

    #[actix_web::test]
    async fn preflight_has_cors_headers() {
        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/execute");
        let (status, headers, body) = call(unreachable_executor(), req).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        for (name, value) in CORS_HEADERS {
            assert_eq!(headers.get(name).unwrap(), value);
        }
    }

    #[actix_web::test]
    async fn empty_body_is_rejected() {
        let (status, body) = post(unreachable_executor(), "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Empty body" }));
    }

    #[actix_web::test]
    async fn missing_signed_action_is_rejected() {
        for body in ["not json", "{}", r#"{"signedAction":null}"#, r#"{"other":1}"#] {
            let (status, body) = post(unreachable_executor(), body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "No signedAction present in body" }));
        }
    }

    #[actix_web::test]
    async fn action_is_forwarded() {
        let executor = FnExecutor(|action: &Value| -> contracts::Result<H256> {
            assert_eq!(action, &json!({ "functionName": "withdrawV2b" }));
            Ok(H256::from_low_u64_be(1))
        });

        let (status, body) = post(executor, WITHDRAW_ACTION).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "txHash": "0x0000000000000000000000000000000000000000000000000000000000000001" })
        );
    }

    #[actix_web::test]
    async fn only_withdrawals_are_relayed() {
        for name in ["registerRoot", "deposit", "transferOwnership"] {
            let body = json!({ "signedAction": { "functionName": name, "args": {} } }).to_string();
            let (status, body) = post(unreachable_executor(), &body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": format!("Function not allowed: {name}") }));
        }

        let (status, body) = post(unreachable_executor(), r#"{"signedAction":{"args":{}}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No functionName in signedAction" }));

        let executor = FnExecutor(|_: &Value| -> contracts::Result<H256> {
            Ok(H256::from_low_u64_be(2))
        });
        let (status, _) = post(executor, r#"{"signedAction":{"functionName":"withdraw"}}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[actix_web::test]
    async fn revert_payload_wins_over_address() {
        let decoy = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
        let payload = foo_payload().to_uppercase().replacen("0X", "0x", 1);
        let executor = FnExecutor(move |_: &Value| -> contracts::Result<H256> {
            revert(format!("execution reverted: from {decoy} data {payload}"))
        });

        let (status, body) = post(executor, WITHDRAW_ACTION).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("execution reverted"));
        assert_eq!(body["debug"]["revertData"], foo_payload());
        assert_eq!(body["debug"]["outerSelector"], foo_payload()[..10]);
        assert_eq!(body["debug"]["outerSignature"], "Foo(uint256)");
        assert!(body["debug"].get("hexCandidates").is_none());
    }

    #[actix_web::test]
    async fn wrapped_reason_is_unwrapped() {
        let inner = selector("Paused()").to_vec();
        let wrapped = format!(
            "0xbc92d5bc{}",
            hex::encode(ethabi::encode(&[Token::Bytes(inner)]))
        );
        let message = format!("reverted with {wrapped}");
        let executor =
            FnExecutor(move |_: &Value| -> contracts::Result<H256> { revert(message.clone()) });

        let (_, body) = post(executor, WITHDRAW_ACTION).await;

        assert_eq!(body["debug"]["outerSelector"], "0xbc92d5bc");
        assert_eq!(body["debug"]["innerSignature"], "Paused()");
        assert_eq!(
            body["debug"]["innerSelector"],
            format!("0x{}", hex::encode(selector("Paused()")))
        );
    }

    #[actix_web::test]
    async fn decoded_revert_is_passed_through() {
        let executor = FnExecutor(|_: &Value| -> contracts::Result<H256> {
            Err(contracts::Error::Revert {
                message: "reverted".to_owned(),
                debug: Some(RevertDebug {
                    revert_data: "0x12345678".to_owned(),
                    outer_selector: "0x12345678".to_owned(),
                    ..Default::default()
                }),
            })
        });

        let (_, body) = post(executor, WITHDRAW_ACTION).await;

        assert_eq!(body["error"], "reverted");
        assert_eq!(body["debug"], json!({ "revertData": "0x12345678", "outerSelector": "0x12345678" }));
    }

    #[actix_web::test]
    async fn failure_without_revert_data_has_no_debug() {
        let executor = FnExecutor(|_: &Value| -> contracts::Result<H256> {
            Err(contracts::Error::InvalidArgument("missing argument `root`".to_owned()))
        });

        let (status, body) = post(executor, WITHDRAW_ACTION).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "invalid contract argument: missing argument `root`" })
        );
    }

    #[actix_web::test]
    async fn unknown_routes_are_not_found() {
        for req in [
            test::TestRequest::get().uri("/execute"),
            test::TestRequest::post().uri("/other"),
            test::TestRequest::get().uri("/"),
        ] {
            let (status, headers, body) = call(unreachable_executor(), req).await;

            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
            assert_eq!(
                serde_json::from_slice::<Value>(&body).unwrap(),
                json!({ "error": "Not found" })
            );
        }
    }
}
