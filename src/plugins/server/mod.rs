mod handlers;

use std::{net::SocketAddr, sync::Arc};

use axum::{
  Router, middleware,
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub struct Plugin;

fn admin_routes() -> Router<Arc<AppState>> {
  use handlers::*;

  Router::new()
    .route("/clients", get(clients))
    .route("/settings", get(settings))
    .route("/settings/{key}", put(set_setting))
    .route("/bonuses", get(bonuses))
    .route("/bonuses/stats", get(bonus_stats))
    .route("/bonuses/grant", post(grant))
    .route("/bonuses/grant-all", post(grant_all))
    .route("/bonuses/redeem", post(redeem))
    .route("/bonuses/{id}", axum::routing::delete(delete_bonus))
    .route("/bonuses/{id}/code", put(update_bonus_code))
    .route("/promotions", get(promotions).post(create_promotion))
    .route(
      "/promotions/{id}",
      put(update_promotion).delete(delete_promotion),
    )
    .route("/promotions/{id}/toggle", post(toggle_promotion))
    .route("/feedback", get(feedback))
    .route("/feedback/{id}", axum::routing::delete(delete_feedback))
    .route("/feedback/{id}/reply", post(reply_feedback))
    .route("/mailings", get(mailings).post(create_mailing))
    .route("/mailings/{id}", put(update_mailing).delete(delete_mailing))
    .route("/mailings/{id}/send", post(send_mailing))
    .route("/giveaways", get(giveaways).post(create_giveaway))
    .route("/giveaways/{id}", get(giveaway).delete(delete_giveaway))
    .route("/giveaways/{id}/finish", post(finish_giveaway))
}

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();

    let admin = admin_routes().layer(middleware::from_fn_with_state(
      app.clone(),
      handlers::require_admin,
    ));

    let router = Router::new()
      .route("/health", get(handlers::health))
      .nest("/api", admin)
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app.clone())
      .into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
