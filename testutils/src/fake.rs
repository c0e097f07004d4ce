use httpmock::prelude::*;
use httpmock::{
    Mock,
    Then,
    When,
};
use serde_json::json;

pub struct MockServerBuilder {
    server: MockServer,
    handlers: Vec<Box<dyn Fn(When, Then)>>,
    mock_ids: Vec<usize>,
}

impl MockServerBuilder {
    pub fn new() -> MockServerBuilder {
        MockServerBuilder {
            server: MockServer::start(),
            handlers: vec![],
            mock_ids: vec![],
        }
    }

    pub fn assert(&self) {
        for id in &self.mock_ids {
            println!("checking assertions for mock {id}");
            Mock::new(*id, &self.server).assert()
        }
    }

    // How many requests the idx'th registered handler has answered so far
    pub fn calls(&self, idx: usize) -> usize {
        Mock::new(self.mock_ids[idx], &self.server).calls()
    }

    // Handlers are registered with the server in the order they're added here, and the server
    // answers with the first mock that matches; add more specific handlers first.
    pub fn handle<F: Fn(When, Then) + 'static>(&mut self, f: F) -> &mut Self {
        self.handlers.push(Box::new(f));
        self
    }

    pub fn handle_pod_watch(&mut self, ns: &str, body: String) -> &mut Self {
        let path = pods_path(ns);
        self.handle(move |when, then| {
            when.path(&path).method(GET).query_param("watch", "true");
            then.status(200).header("content-type", "application/json").body(&body);
        })
    }

    // The apiserver rejects a watch with a plain Status body, not a watch event
    pub fn handle_pod_watch_status(&mut self, ns: &str, status: serde_json::Value) -> &mut Self {
        let path = pods_path(ns);
        self.handle(move |when, then| {
            let code = status["code"].as_u64().unwrap_or(500) as u16;
            when.path(&path).method(GET).query_param("watch", "true");
            then.status(code).json_body(status.clone());
        })
    }

    pub fn handle_pod_list(&mut self, ns: &str, list: serde_json::Value) -> &mut Self {
        let path = pods_path(ns);
        self.handle(move |when, then| {
            when.path(&path).method(GET);
            then.json_body(list.clone());
        })
    }

    pub fn handle_status(&mut self, path: String, status: serde_json::Value) -> &mut Self {
        self.handle(move |when, then| {
            let code = status["code"].as_u64().unwrap_or(500) as u16;
            when.path(&path);
            then.status(code).json_body(status.clone());
        })
    }

    pub fn build(&mut self) {
        for f in self.handlers.iter() {
            self.mock_ids.push(self.server.mock(f).id);
        }
    }

    pub fn url(&self) -> http::Uri {
        http::Uri::try_from(self.server.url("/")).unwrap()
    }
}

impl Default for MockServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn make_fake_apiserver() -> (MockServerBuilder, kube::Client) {
    let builder = MockServerBuilder::new();
    let config = kube::Config::new(builder.url());
    let client = kube::Client::try_from(config).unwrap();
    (builder, client)
}

pub fn pods_path(ns: &str) -> String {
    format!("/api/v1/namespaces/{ns}/pods")
}

pub fn status_forbidden() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "message": "pods is forbidden",
      "reason": "Forbidden",
      "code": 403
    })
}

pub fn status_expired() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "message": "too old resource version",
      "reason": "Expired",
      "code": 410
    })
}
