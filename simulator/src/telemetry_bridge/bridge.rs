use crate::telemetry_bridge::model::TelemetryModel;
use alertcore::telemetry::MetricsRecorder;
use log::error;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

pub fn default_bind_address(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

struct RegisteredNode {
    name: String,
    metrics: Arc<MetricsRecorder>,
}

type Registry = Arc<RwLock<Vec<RegisteredNode>>>;

fn collect(registry: &Registry) -> Vec<TelemetryModel> {
    match registry.read() {
        Ok(nodes) => nodes
            .iter()
            .map(|node| TelemetryModel::new(&node.name, node.metrics.snapshot()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Serves node counters as JSON: `GET /telemetry` and `GET /telemetry/<node>`.
#[derive(Clone, Default)]
pub struct TelemetryBridge {
    registry: Registry,
}

impl TelemetryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, metrics: Arc<MetricsRecorder>) {
        if let Ok(mut nodes) = self.registry.write() {
            nodes.push(RegisteredNode {
                name: name.to_string(),
                metrics,
            });
        }
    }

    pub fn snapshot(&self) -> Vec<TelemetryModel> {
        collect(&self.registry)
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let list_registry = self.registry.clone();
        let node_registry = self.registry.clone();

        let list_route = warp::path("telemetry")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&collect(&list_registry)));

        let node_route = warp::path!("telemetry" / String)
            .and(warp::get())
            .map(move |name: String| {
                match collect(&node_registry)
                    .into_iter()
                    .find(|model| model.node == name)
                {
                    Some(model) => {
                        warp::reply::with_status(warp::reply::json(&model), StatusCode::OK)
                    }
                    None => warp::reply::with_status(
                        warp::reply::json(&json!({"error": "unknown node", "node": name})),
                        StatusCode::NOT_FOUND,
                    ),
                }
            });

        list_route.or(node_route)
    }

    /// Starts the HTTP endpoint on its own thread and runtime.
    pub fn serve(&self, address: SocketAddr) -> thread::JoinHandle<()> {
        let routes = self.routes();
        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("telemetry bridge runtime failed: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(routes).run(address).await;
            });
        })
    }

    pub fn publish_status(&self, message: &str) {
        println!("[telemetry] {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertcore::telemetry::{TelemetryEvent, TelemetrySink};

    fn bridge_with_relay() -> (TelemetryBridge, Arc<MetricsRecorder>) {
        let bridge = TelemetryBridge::new();
        let metrics = Arc::new(MetricsRecorder::new());
        bridge.register("relay", metrics.clone());
        (bridge, metrics)
    }

    #[test]
    fn bridge_snapshot_reflects_recorder() {
        let (bridge, metrics) = bridge_with_relay();
        metrics.record(TelemetryEvent::AlertReceived);
        metrics.record(TelemetryEvent::AlertDelay(0.5));

        let models = bridge.snapshot();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].node, "relay");
        assert_eq!(models[0].metrics.received, 1);
        assert_eq!(models[0].average_delay, Some(0.5));
    }

    #[tokio::test]
    async fn telemetry_route_lists_nodes() {
        let (bridge, metrics) = bridge_with_relay();
        metrics.record(TelemetryEvent::AlertForwarded);

        let response = warp::test::request()
            .method("GET")
            .path("/telemetry")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let models: Vec<TelemetryModel> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(models[0].metrics.forwarded, 1);
    }

    #[tokio::test]
    async fn unknown_node_is_not_found() {
        let (bridge, _) = bridge_with_relay();
        let response = warp::test::request()
            .method("GET")
            .path("/telemetry/receiver")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = warp::test::request()
            .method("GET")
            .path("/telemetry/relay")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
