mod common;

use api_model::framework::mock::{MockTransport, RecordingNotifier};
use api_model::framework::{
    ApiErrorMiddleware, ApiSuccessMiddleware, Command, EndpointConfig, Handlers, ModelBuilder,
    Redirect, Settings, ShowLoadingMiddleware, TransportError, REDIRECT_COMMAND,
};
use api_model::lifecycle::Runtime;
use common::{next_of, wait_until};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Simple commands and API outcomes flowing into one state slice.
#[tokio::test]
async fn test_model_state_follows_commands() {
    let transport = MockTransport::new();
    transport.expect_request().return_ok(json!({ "age": 40 }));

    let settings = Settings::builder(transport.clone()).build();
    let mut model = ModelBuilder::new("test")
        .simple("add", "add")
        .api("getAge", EndpointConfig::new("/age").with_method("GET"))
        .initial_state(json!({ "age": 11 }))
        .reducer(|names| {
            Handlers::new()
                .on(names.simple["add"].clone(), |state, _| {
                    state["age"] = json!(state["age"].as_i64().unwrap_or(0) + 1);
                })
                .on(names.api["getAge"].success.clone(), |state, command| {
                    state["age"] = command.payload["res"]["age"].clone();
                })
                .into_reducer()
        })
        .build(&settings);
    assert_eq!(model.names.simple["add"], "test-add");

    let mut runtime = Runtime::new(settings);
    runtime.mount(&mut model);
    let mut tap = runtime.tap();

    runtime.dispatch(model.creators.simple["add"].call());
    assert_eq!(runtime.state("test"), Some(json!({ "age": 12 })));

    runtime.dispatch(model.creators.api["getAge"].call());
    next_of(&mut tap, "api-test-GET-getAge_success").await;
    assert_eq!(runtime.state("test"), Some(json!({ "age": 40 })));

    runtime.shutdown().await.unwrap();
    transport.verify();
}

#[tokio::test]
async fn test_success_follow_ups() {
    let transport = MockTransport::new();
    transport.expect_request().return_ok(json!({}));
    let notifier = RecordingNotifier::new();

    let settings = Settings::builder(transport.clone())
        .notifier(notifier.clone())
        .build();
    let mut model = ModelBuilder::new("test")
        .api(
            "save",
            EndpointConfig::new("/save")
                .with_notify_on_success("saved")
                .with_navigate_on_success(Redirect::new("UserList").with_message("back to list")),
        )
        .build(&settings);

    let mut runtime = Runtime::new(settings);
    runtime.mount(&mut model);
    let mut tap = runtime.tap();

    runtime.dispatch(model.creators.api["save"].call());
    next_of(&mut tap, "api-test-POST-save_success").await;
    let redirect = next_of(&mut tap, REDIRECT_COMMAND).await;
    assert_eq!(redirect.payload["target"], json!("UserList"));

    runtime.shutdown().await.unwrap();
    assert_eq!(notifier.messages(), ["back to list", "saved"]);
}

#[tokio::test]
async fn test_middlewares_observe_outcomes() {
    let transport = MockTransport::new();
    transport.expect_request().return_ok(json!({}));
    transport
        .expect_request()
        .return_err(TransportError::Status { status: 500 });

    let settings = Settings::builder(transport.clone()).build();
    let mut model = ModelBuilder::new("test")
        .api("save", EndpointConfig::new("/save").with_show_loading("saving"))
        .build(&settings);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut runtime = Runtime::new(settings);
    let (on_start, on_end) = (seen.clone(), seen.clone());
    runtime.add_middleware(ShowLoadingMiddleware::new(
        move |tag| on_start.lock().unwrap().push(format!("show {}", tag.to_value())),
        move |tag| on_end.lock().unwrap().push(format!("hide {}", tag.to_value())),
    ));
    let errors = seen.clone();
    runtime.add_middleware(ApiErrorMiddleware::new(move |command: &Command| {
        errors.lock().unwrap().push(format!("error {}", command.payload["error"]["status"]));
    }));
    let successes = seen.clone();
    runtime.add_middleware(ApiSuccessMiddleware::new(move |command: &Command| {
        successes.lock().unwrap().push(format!("success {}", command.kind));
    }));
    runtime.mount(&mut model);
    let mut tap = runtime.tap();

    runtime.dispatch(model.creators.api["save"].call());
    next_of(&mut tap, "api-test-POST-save_success").await;
    runtime.dispatch(model.creators.api["save"].call());
    next_of(&mut tap, "api-test-POST-save_error").await;
    wait_until(|| seen.lock().unwrap().len() == 6).await;

    assert_eq!(
        *seen.lock().unwrap(),
        [
            "show \"saving\"",
            "hide \"saving\"",
            "success api-test-POST-save_success",
            "show \"saving\"",
            "hide \"saving\"",
            "error 500",
        ]
    );
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_model_base_path_and_name_override() {
    let transport = MockTransport::new();
    transport
        .expect_request()
        .with_uri("/v2/stats")
        .return_ok(json!({}));
    transport
        .expect_request()
        .with_uri("/own/stats")
        .return_ok(json!({}));

    let settings = Settings::builder(transport.clone()).base_path("/api").build();
    let mut model = ModelBuilder::new("test")
        .base_path("/v2")
        .api("stats", EndpointConfig::new("/stats").with_model_name("shared"))
        .api("own", EndpointConfig::new("/stats").with_base_path("/own").with_auto_loading(true))
        .initial_state(json!({}))
        .build(&settings);
    assert_eq!(model.names.api["stats"].request, "api-shared-POST-stats_request");

    let mut runtime = Runtime::new(settings);
    runtime.mount(&mut model);
    let mut tap = runtime.tap();

    runtime.dispatch(model.creators.api["stats"].call());
    next_of(&mut tap, "api-shared-POST-stats_success").await;
    runtime.dispatch(model.creators.api["own"].call());
    let start = next_of(&mut tap, "test-startLoading").await;
    assert_eq!(start.payload["flagName"], json!("loading"));
    next_of(&mut tap, "api-test-POST-own_success").await;

    runtime.shutdown().await.unwrap();
    transport.verify();
}

#[tokio::test]
async fn test_mounting_twice_starts_tasks_once() {
    let transport = MockTransport::new();
    let settings = Settings::builder(transport.clone()).build();
    let mut model = ModelBuilder::new("test")
        .api("a", EndpointConfig::new("/a"))
        .build(&settings);

    let mut runtime = Runtime::new(settings);
    runtime.mount(&mut model);
    runtime.mount(&mut model);
    assert_eq!(runtime.bus().subscriber_count("api-test-POST-a_request"), 1);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_declarations_from_json() {
    let transport = MockTransport::new();
    transport
        .expect_request()
        .with_method("GET")
        .with_uri("/orders/3")
        .return_ok(json!({ "id": 3 }));

    let settings = Settings::builder(transport.clone()).build();
    let mut model = ModelBuilder::new("shop")
        .simple_set(&json!({ "reset": "reset" }))
        .api_set(&json!({
            "getOrder": { "path": "/orders/:id", "method": "get", "autoLoading": true },
            "broken": { "method": "GET" }
        }))
        .rest_set(&json!("not an object"))
        .initial_state(json!({ "loading": false }))
        .build(&settings);
    assert!(model.names.api.get("broken").is_none());
    assert!(model.names.rest.is_empty());

    let mut runtime = Runtime::new(settings);
    runtime.mount(&mut model);
    let mut tap = runtime.tap();

    runtime.dispatch(model.creators.api["getOrder"].create(json!({ "id": 3 })));
    let done = next_of(&mut tap, "api-shop-GET-getOrder_success").await;
    assert_eq!(done.payload["res"]["id"], json!(3));
    assert_eq!(runtime.state("shop"), Some(json!({ "loading": false })));

    runtime.shutdown().await.unwrap();
    transport.verify();
}
