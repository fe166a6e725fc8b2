//! Reverse-geocoding client behaviour against a mocked Nominatim.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use whereabouts::api::{GeocodingClient, GeocodingEndpoint, GeocodingSettings};
use whereabouts::domain::Coordinate;
use whereabouts::error::GeocodeError;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn direct_client(server: &MockServer) -> GeocodingClient {
    let mut settings = GeocodingSettings::new(GeocodingEndpoint::Direct {
        base_url: server.uri(),
        email: "ops@example.org".to_string(),
    });
    settings.first_timeout = Duration::from_millis(200);
    settings.retry_timeout = Duration::from_secs(2);
    GeocodingClient::new(Client::new(), settings).expect("client construction should not fail")
}

fn shanghai_body() -> serde_json::Value {
    serde_json::json!({
        "display_name": "People's Square, Huangpu, Shanghai, China",
        "address": {
            "road": "Renmin Avenue",
            "suburb": "Huangpu",
            "city": "Shanghai",
            "state": "Shanghai",
            "region": "East China",
            "postcode": "200003",
            "country": "China"
        }
    })
}

#[tokio::test]
async fn reverse_sends_expected_query_and_parses_address() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "jsonv2"))
        .and(query_param("lat", "31.2304"))
        .and(query_param("lon", "121.4737"))
        .and(query_param("addressdetails", "1"))
        .and(query_param("zoom", "18"))
        .and(query_param("email", "ops@example.org"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shanghai_body()))
        .expect(1)
        .mount(&server)
        .await;

    let address = direct_client(&server)
        .reverse(Coordinate::new(31.2304, 121.4737))
        .await
        .expect("should resolve");

    assert_eq!(address.provider, "Nominatim");
    assert_eq!(address.province.as_deref(), Some("Shanghai"));
    assert_eq!(address.city.as_deref(), Some("Shanghai"));
    assert_eq!(address.district.as_deref(), Some("Huangpu"));
    assert_eq!(address.street.as_deref(), Some("Renmin Avenue"));
    assert_eq!(address.house_number, None);
    assert_eq!(address.postcode.as_deref(), Some("200003"));
}

#[tokio::test]
async fn server_error_then_success_retries_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shanghai_body()))
        .expect(1)
        .mount(&server)
        .await;

    let address = direct_client(&server)
        .reverse(Coordinate::new(31.2304, 121.4737))
        .await
        .expect("retry should succeed");

    assert_eq!(
        address.display_name.as_deref(),
        Some("People's Square, Huangpu, Shanghai, China")
    );
}

#[tokio::test]
async fn two_server_errors_surface_http_error_without_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let err = direct_client(&server)
        .reverse(Coordinate::new(0.0, 0.0))
        .await
        .unwrap_err();

    assert!(
        matches!(err, GeocodeError::Http { status } if status == StatusCode::INTERNAL_SERVER_ERROR),
        "unexpected error: {err:?}"
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn slow_first_attempt_times_out_and_retry_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(shanghai_body())
                .set_delay(Duration::from_secs(1)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shanghai_body()))
        .mount(&server)
        .await;

    let address = direct_client(&server)
        .reverse(Coordinate::new(31.2304, 121.4737))
        .await
        .expect("retry should succeed after timeout");

    assert_eq!(address.country.as_deref(), Some("China"));
}

#[tokio::test]
async fn malformed_body_is_parse_error_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = direct_client(&server)
        .reverse(Coordinate::new(0.0, 0.0))
        .await
        .unwrap_err();

    assert!(matches!(err, GeocodeError::Parse(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn proxy_mode_omits_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shanghai_body()))
        .mount(&server)
        .await;

    let settings = GeocodingSettings::new(GeocodingEndpoint::Proxy {
        base_url: server.uri(),
    });
    let client = GeocodingClient::new(Client::new(), settings).unwrap();
    let address = client.reverse(Coordinate::new(1.0, 2.0)).await.unwrap();

    assert_eq!(address.provider, "Nominatim (via proxy)");
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].url.query_pairs().any(|(k, _)| k == "email"));
}
