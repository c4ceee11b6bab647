#![allow(dead_code)]

use pathium::{receive_body, receive_from, Endpoint, Recorder, Scope};

pub async fn call(app: &impl Endpoint, scope: Scope) -> Recorder {
    let recorder = Recorder::new();
    app.call(scope, receive_from(Vec::new()), recorder.send())
        .await
        .unwrap_or_else(|e| panic!("exchange failed: {e}"));
    recorder
}

pub async fn call_with_body(app: &impl Endpoint, scope: Scope, body: &str) -> Recorder {
    let recorder = Recorder::new();
    app.call(scope, receive_body(body), recorder.send())
        .await
        .unwrap_or_else(|e| panic!("exchange failed: {e}"));
    recorder
}

pub async fn get(app: &impl Endpoint, path: &str) -> Recorder {
    call(app, Scope::http("GET", path)).await
}
