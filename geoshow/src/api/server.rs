use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::api::map::MapConfig;
use crate::error::{Error, Result};
use crate::index::FeatureCollection;
use crate::serving::ServingTable;

#[derive(Clone)]
pub struct AppState {
    pub features: Arc<FeatureCollection>,
    pub serving: Arc<ServingTable>,
    pub map: Arc<MapConfig>,
}

pub struct ApiServer {
    state: AppState,
    ui: Option<Router>,
}

impl ApiServer {
    pub fn new(features: FeatureCollection, serving: ServingTable, map: MapConfig) -> Self {
        Self {
            state: AppState {
                features: Arc::new(features),
                serving: Arc::new(serving),
                map: Arc::new(map),
            },
            ui: None,
        }
    }

    /// Serve `ui` for every path the API does not handle.
    pub fn with_ui(mut self, ui: Router) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        let mut api = Router::new()
            .route("/features.geojson", get(crate::api::routes::features))
            .route("/photos/*path", get(crate::api::routes::photo))
            .route("/map.json", get(crate::api::routes::map))
            .with_state(self.state.clone());

        if let Some(archive) = &self.state.map.tile_archive {
            api = api.route_service(&archive.route, ServeFile::new(&archive.path));
        }

        if let Some(ui) = &self.ui {
            api = api.merge(ui.clone());
        }

        api.layer(TraceLayer::new_for_http())
    }

    /// Bind `addr` and serve until `shutdown` resolves.
    pub async fn serve<F>(self, addr: &str, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        self.serve_listener(listener, shutdown).await
    }

    pub async fn serve_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local: SocketAddr = listener.local_addr()?;
        tracing::info!("Server listening on http://{}", local);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        Ok(())
    }
}
