pub mod client;
pub mod error;
pub mod limits;
pub mod manager;
pub mod methods;
pub mod models;
pub mod query;
pub mod render;
pub mod routes;
pub mod settings;
pub mod td;
pub mod tqueue;
pub mod update_types;
pub mod webhook_db;
pub mod webhooks;

use std::sync::Arc;
use std::sync::atomic::AtomicI64;

use client::SharedDeps;
use manager::ClientManager;
use settings::Settings;
use tqueue::TQueue;
use webhook_db::WebhookDb;

/// Build the gateway with settings from the environment. The caller supplies
/// the native-client bridge factory; webhook delivery uses the HTTPS
/// connector.
pub fn gateway_from_env(bridge_factory: Arc<dyn td::BridgeFactory>) -> rocket::Rocket<rocket::Build> {
    let settings = Settings::from_env();
    gateway(settings, bridge_factory, Arc::new(webhooks::HttpsConnector))
}

pub fn gateway(
    settings: Settings,
    bridge_factory: Arc<dyn td::BridgeFactory>,
    connector: Arc<dyn webhooks::Connector>,
) -> rocket::Rocket<rocket::Build> {
    let settings = Arc::new(settings);
    std::fs::create_dir_all(&settings.base_dir).ok();
    let webhook_db = Arc::new(WebhookDb::open(&format!(
        "{}/webhooks.db",
        settings.base_dir
    )));
    build_gateway(settings, bridge_factory, connector, webhook_db)
}

/// Variant with an in-memory webhook store, for tests and ephemeral runs.
pub fn gateway_in_memory(
    settings: Settings,
    bridge_factory: Arc<dyn td::BridgeFactory>,
    connector: Arc<dyn webhooks::Connector>,
) -> rocket::Rocket<rocket::Build> {
    build_gateway(
        Arc::new(settings),
        bridge_factory,
        connector,
        Arc::new(WebhookDb::open_in_memory()),
    )
}

fn build_gateway(
    settings: Arc<Settings>,
    bridge_factory: Arc<dyn td::BridgeFactory>,
    connector: Arc<dyn webhooks::Connector>,
    webhook_db: Arc<WebhookDb>,
) -> rocket::Rocket<rocket::Build> {
    let deps = SharedDeps {
        settings,
        tqueue: Arc::new(TQueue::new()),
        webhook_db,
        connector,
        bridge_factory,
        unix_time_offset: Arc::new(AtomicI64::new(0)),
    };

    rocket::build()
        .manage(ClientManager::new(deps))
        .register(
            "/",
            rocket::catchers![routes::not_found, routes::too_many_requests],
        )
        .mount(
            "/",
            rocket::routes![routes::bot_method_post, routes::bot_method_get],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff(
            "Client Recycler",
            |rocket| {
                Box::pin(async move {
                    if let Some(manager) = rocket.state::<ClientManager>() {
                        manager.start_sweeper();
                    }
                })
            },
        ))
}
