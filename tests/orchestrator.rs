//! End-to-end runs of the orchestrator with mocked services and fake
//! location platforms.

use reqwest::Client;
use std::time::Duration;
use whereabouts::api::{
    GeocodingClient, GeocodingEndpoint, GeocodingSettings, PoiClient, PoiSettings,
};
use whereabouts::domain::{Coordinate, PositionSample};
use whereabouts::locate::{
    FixedPlatform, LocationPlatform, OnPosition, OnPositionError, PositionOptions,
};
use whereabouts::orchestrator::{
    ADDRESS_FAILED, ADDRESS_NOT_RESOLVED, LookupStage, Orchestrator, POI_DISABLED, POI_FAILED,
    POI_NOT_QUERIED, PositionStage, RunReport, Surfaces,
};
use whereabouts::surface::{MemorySurface, SurfaceUpdate};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Denying;

impl LocationPlatform for Denying {
    fn get_current_position(
        &self,
        _on_position: OnPosition,
        on_error: OnPositionError,
        _options: &PositionOptions,
    ) {
        on_error("User denied Geolocation".to_string());
    }
}

struct Panels {
    position: MemorySurface,
    address: MemorySurface,
    poi: MemorySurface,
}

impl Panels {
    fn new() -> Self {
        Self {
            position: MemorySurface::default(),
            address: MemorySurface::default(),
            poi: MemorySurface::default(),
        }
    }

    fn assert_all_settled(&self) {
        assert!(self.position.is_settled(), "position: {:?}", self.position);
        assert!(self.address.is_settled(), "address: {:?}", self.address);
        assert!(self.poi.is_settled(), "poi: {:?}", self.poi);
    }
}

async fn run(
    orchestrator: &Orchestrator,
    platform: Option<&dyn LocationPlatform>,
    panels: &mut Panels,
) -> RunReport {
    let mut surfaces = Surfaces {
        position: &mut panels.position,
        address: &mut panels.address,
        poi: &mut panels.poi,
    };
    orchestrator.run(platform, &mut surfaces).await
}

fn geocoder(server: &MockServer) -> GeocodingClient {
    let mut settings = GeocodingSettings::new(GeocodingEndpoint::Proxy {
        base_url: server.uri(),
    });
    settings.first_timeout = Duration::from_millis(500);
    settings.retry_timeout = Duration::from_millis(500);
    GeocodingClient::new(Client::new(), settings).unwrap()
}

fn poi_client(server: &MockServer) -> PoiClient {
    let settings = PoiSettings {
        url: format!("{}/api/interpreter", server.uri()),
        ..PoiSettings::default()
    };
    PoiClient::new(Client::new(), settings).unwrap()
}

fn address_body() -> serde_json::Value {
    serde_json::json!({
        "display_name": "Champ de Mars, Paris, France",
        "address": {"road": "Avenue Anatole France", "city": "Paris", "country": "France"}
    })
}

fn poi_body() -> serde_json::Value {
    serde_json::json!({
        "elements": [
            {"type": "node", "lat": 48.8590, "lon": 2.2945, "tags": {"name": "Kiosk", "shop": "kiosk"}}
        ]
    })
}

fn eiffel() -> FixedPlatform {
    FixedPlatform::new(Coordinate::new(48.8584, 2.2945))
}

#[tokio::test]
async fn position_failure_skips_both_lookups() {
    let geo_server = MockServer::start().await;
    let poi_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(address_body()))
        .expect(0)
        .mount(&geo_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poi_body()))
        .expect(0)
        .mount(&poi_server)
        .await;

    let orchestrator = Orchestrator::new(
        geocoder(&geo_server),
        Some(poi_client(&poi_server)),
        PositionOptions::default(),
    );
    let mut panels = Panels::new();
    let report = run(&orchestrator, Some(&Denying), &mut panels).await;

    assert_eq!(report.position, PositionStage::Failed);
    assert_eq!(report.address, LookupStage::NotAttempted);
    assert_eq!(report.poi, LookupStage::NotAttempted);
    assert_eq!(report.sample, None);

    assert_eq!(
        panels.position.current(),
        Some("Location failed: User denied Geolocation")
    );
    assert_eq!(
        panels.address.history,
        [SurfaceUpdate::Shown(ADDRESS_NOT_RESOLVED.to_string())]
    );
    assert_eq!(
        panels.poi.history,
        [SurfaceUpdate::Shown(POI_NOT_QUERIED.to_string())]
    );
    assert!(geo_server.received_requests().await.unwrap().is_empty());
    assert!(poi_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_platform_reports_unsupported() {
    let geo_server = MockServer::start().await;
    let orchestrator = Orchestrator::new(geocoder(&geo_server), None, PositionOptions::default());
    let mut panels = Panels::new();

    let report = run(&orchestrator, None, &mut panels).await;

    assert_eq!(report.position, PositionStage::Failed);
    assert_eq!(
        panels.position.current(),
        Some("Location failed: geolocation is not supported on this platform")
    );
    panels.assert_all_settled();
}

#[tokio::test]
async fn address_failure_still_runs_poi_lookup() {
    let geo_server = MockServer::start().await;
    let poi_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&geo_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poi_body()))
        .expect(1)
        .mount(&poi_server)
        .await;

    let orchestrator = Orchestrator::new(
        geocoder(&geo_server),
        Some(poi_client(&poi_server)),
        PositionOptions::default(),
    );
    let mut panels = Panels::new();
    let platform = eiffel();
    let report = run(&orchestrator, Some(&platform), &mut panels).await;

    assert_eq!(report.position, PositionStage::Acquired);
    assert_eq!(report.address, LookupStage::Failed);
    assert_eq!(report.poi, LookupStage::Succeeded);
    assert_eq!(panels.address.current(), Some(ADDRESS_FAILED));

    let points: serde_json::Value = serde_json::from_str(panels.poi.current().unwrap()).unwrap();
    assert_eq!(points[0]["name"], "Kiosk");
    assert_eq!(points[0]["distance_m"], 67);
    panels.assert_all_settled();
}

#[tokio::test]
async fn poi_failure_leaves_address_intact() {
    let geo_server = MockServer::start().await;
    let poi_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(address_body()))
        .mount(&geo_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(504))
        .expect(1)
        .mount(&poi_server)
        .await;

    let orchestrator = Orchestrator::new(
        geocoder(&geo_server),
        Some(poi_client(&poi_server)),
        PositionOptions::default(),
    );
    let mut panels = Panels::new();
    let platform = eiffel();
    let report = run(&orchestrator, Some(&platform), &mut panels).await;

    assert_eq!(report.address, LookupStage::Succeeded);
    assert_eq!(report.poi, LookupStage::Failed);
    assert_eq!(panels.poi.current(), Some(POI_FAILED));

    let address: serde_json::Value =
        serde_json::from_str(panels.address.current().unwrap()).unwrap();
    assert_eq!(address["city"], "Paris");
    assert_eq!(address["street"], "Avenue Anatole France");
    assert!(address["postcode"].is_null());
}

#[tokio::test]
async fn disabled_poi_shows_notice_without_request() {
    let geo_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(address_body()))
        .mount(&geo_server)
        .await;

    let orchestrator = Orchestrator::new(geocoder(&geo_server), None, PositionOptions::default());
    let mut panels = Panels::new();
    let platform = eiffel();
    let report = run(&orchestrator, Some(&platform), &mut panels).await;

    assert_eq!(report.address, LookupStage::Succeeded);
    assert_eq!(report.poi, LookupStage::Skipped);
    assert_eq!(
        panels.poi.history,
        [SurfaceUpdate::Shown(POI_DISABLED.to_string())]
    );
    panels.assert_all_settled();
}

#[tokio::test]
async fn successful_run_fills_every_panel() {
    let geo_server = MockServer::start().await;
    let poi_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(address_body()))
        .expect(1)
        .mount(&geo_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poi_body()))
        .expect(1)
        .mount(&poi_server)
        .await;

    let orchestrator = Orchestrator::new(
        geocoder(&geo_server),
        Some(poi_client(&poi_server)),
        PositionOptions::default(),
    );
    let mut panels = Panels::new();
    let platform = eiffel();
    let report = run(&orchestrator, Some(&platform), &mut panels).await;

    assert_eq!(report.position, PositionStage::Acquired);
    assert_eq!(report.address, LookupStage::Succeeded);
    assert_eq!(report.poi, LookupStage::Succeeded);
    let sample: &PositionSample = report.sample.as_ref().unwrap();
    assert_eq!(sample.coordinate, Coordinate::new(48.8584, 2.2945));

    let position: serde_json::Value =
        serde_json::from_str(panels.position.current().unwrap()).unwrap();
    assert_eq!(position["lat"], 48.8584);
    assert_eq!(position["lng"], 2.2945);

    // each lookup announced itself before settling
    assert!(matches!(panels.address.history[0], SurfaceUpdate::Pending(_)));
    assert!(matches!(panels.poi.history[0], SurfaceUpdate::Pending(_)));
    panels.assert_all_settled();
}
