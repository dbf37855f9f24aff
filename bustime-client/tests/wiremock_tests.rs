//! Integration tests for the BusTime client (wiremock-based).

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bustime_client::api::{
    BulletinQuery, BustimeClient, BustimeConfig, PredictionQuery, ResponseFormat, VehicleQuery,
};
use bustime_client::api::error::BustimeError;
use bustime_client::cache::{CacheConfig, CachePolicy, CachedBustimeClient};
use bustime_client::domain::{Direction, RouteId, RouteRegistry, StopId, VehicleId};

fn client_for(server: &MockServer) -> BustimeClient {
    let config = BustimeConfig::new("TESTKEY")
        .with_base_url(server.uri())
        .with_timeout(5);
    BustimeClient::new(config).unwrap()
}

fn cached_client_for(server: &MockServer) -> CachedBustimeClient {
    CachedBustimeClient::new(client_for(server), &CacheConfig::default())
}

const VEHICLES_JSON: &str = r#"{"bustime-response": {
    "vehicle": [
        {
            "vid": "5666", "tmstmp": "20140925 22:46:33",
            "lat": "40.44886169433594", "lon": "-80.16286682128906",
            "hdg": "164", "pid": "2250", "pdist": "49113",
            "rt": "28X", "des": "Oakland", "spd": "16"
        },
        {
            "vid": "5543", "tmstmp": "20140925 22:47:02",
            "lat": "40.407", "lon": "-79.902",
            "hdg": "90", "pid": "2251", "pdist": "1200",
            "rt": "28X", "des": "Downtown", "spd": "31", "dly": "true"
        }
    ]
}}"#;

const SINGLE_VEHICLE_JSON: &str = r#"{"bustime-response": {
    "vehicle": {
        "vid": "5666", "tmstmp": "20140925 22:46:33",
        "lat": "40.44886169433594", "lon": "-80.16286682128906",
        "hdg": "164", "pid": "2250", "pdist": "49113",
        "rt": "28X", "des": "Oakland", "spd": "16"
    }
}}"#;

const ROUTES_JSON: &str = r##"{"bustime-response": {
    "route": [
        {"rt": "13", "rtnm": "BELLEVUE", "rtclr": "#ff6666"},
        {"rt": "28X", "rtnm": "AIRPORT FLYER", "rtclr": "#b22222"}
    ]
}}"##;

const STOPS_JSON: &str = r#"{"bustime-response": {
    "stop": [
        {"stpid": "4123", "stpnm": "Forbes and Murray", "lat": "40.438", "lon": "-79.922"},
        {"stpid": "4124", "lat": "40.439", "lon": "-79.925"}
    ]
}}"#;

const PREDICTIONS_JSON: &str = r#"{"bustime-response": {
    "prd": {
        "tmstmp": "20140925 22:46:33", "typ": "A",
        "stpid": "4123", "stpnm": "Forbes and Murray",
        "vid": "5666", "dstp": "2842",
        "rt": "28X", "rtdir": "INBOUND", "des": "Oakland",
        "prdtm": "20140925 22:58:00"
    }
}}"#;

const NO_DATA_JSON: &str =
    r#"{"bustime-response": {"error": {"msg": "No data found for parameter"}}}"#;

const QUOTA_JSON: &str = r#"{"bustime-response": {"error":
    {"msg": "No API access permitted: Transaction limit for current day has been exceeded."}}}"#;

#[tokio::test]
async fn vehicles_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getvehicles"))
        .and(query_param("key", "TESTKEY"))
        .and(query_param("format", "json"))
        .and(query_param("localestring", "en_US"))
        .and(query_param("tmres", "s"))
        .and(query_param("rt", "28X"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VEHICLES_JSON))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let vehicles = client
        .vehicles(&VehicleQuery::on_routes([RouteId::from("28X")]))
        .await
        .unwrap();

    assert_eq!(vehicles.len(), 2);
    assert_eq!(vehicles[0].id.as_str(), "5666");
    assert!(!vehicles[0].delayed);
    assert!(vehicles[1].delayed);
    assert_eq!(vehicles[1].speed_mph, 31);
}

#[tokio::test]
async fn bare_object_vehicle_normalizes_to_one() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getvehicles"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SINGLE_VEHICLE_JSON))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let vehicles = client
        .vehicles(&VehicleQuery::by_ids([VehicleId::from("5666")]))
        .await
        .unwrap();

    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].destination, "Oakland");
}

#[tokio::test]
async fn xml_format_end_to_end() {
    let server = MockServer::start().await;

    let xml = r#"<?xml version="1.0"?>
<bustime-response>
    <stop><stpid>4123</stpid><stpnm>Forbes and Murray</stpnm><lat>40.438</lat><lon>-79.922</lon></stop>
</bustime-response>"#;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .and(query_param("format", "xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(xml))
        .mount(&server)
        .await;

    let config = BustimeConfig::new("TESTKEY")
        .with_base_url(server.uri())
        .with_format(ResponseFormat::Xml);
    let client = BustimeClient::new(config).unwrap();

    let stops = client
        .stops(&RouteId::from("28X"), Direction::Inbound)
        .await
        .unwrap();

    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].name(), "Forbes and Murray");
}

#[tokio::test]
async fn http_429_maps_to_quota_without_body_parsing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getvehicles"))
        .respond_with(ResponseTemplate::new(429).set_body_string("not an envelope"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .vehicles(&VehicleQuery::by_ids([VehicleId::from("1")]))
        .await
        .unwrap_err();

    assert!(matches!(err, BustimeError::QuotaExceeded(_)));
}

#[tokio::test]
async fn quota_error_in_envelope_is_distinguished() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getvehicles"))
        .respond_with(ResponseTemplate::new(200).set_body_string(QUOTA_JSON))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .vehicles(&VehicleQuery::by_ids([VehicleId::from("1")]))
        .await
        .unwrap_err();

    assert!(matches!(err, BustimeError::QuotaExceeded(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn business_error_carries_upstream_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getroutes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"bustime-response": {"error": {"msg": "Invalid API access key supplied"}}}"#,
        ))
        .mount(&server)
        .await;

    let err = client_for(&server).routes().await.unwrap_err();
    match err {
        BustimeError::Api(msg) => assert!(msg.contains("Invalid API access key")),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn no_data_becomes_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getpredictions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_DATA_JSON))
        .mount(&server)
        .await;

    let predictions = client_for(&server)
        .predictions(&PredictionQuery::for_stops([StopId::from("9999")]))
        .await
        .unwrap();

    assert!(predictions.is_empty());
}

#[tokio::test]
async fn invalid_call_issues_no_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let both = VehicleQuery {
        vehicles: vec![VehicleId::from("5666")],
        routes: vec![RouteId::from("28X")],
    };
    assert!(matches!(
        client.vehicles(&both).await.unwrap_err(),
        BustimeError::InvalidCall(_)
    ));

    assert!(matches!(
        client.vehicles(&VehicleQuery::default()).await.unwrap_err(),
        BustimeError::InvalidCall(_)
    ));

    assert!(matches!(
        client
            .bulletins(&BulletinQuery::default().in_direction(Direction::Inbound))
            .await
            .unwrap_err(),
        BustimeError::InvalidCall(_)
    ));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn stops_cache_hits_within_ttl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOPS_JSON))
        .expect(1)
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let rt = RouteId::from("28X");

    let first = cached.stops(&rt, Direction::Inbound).await.unwrap();
    let second = cached.stops(&rt, Direction::Inbound).await.unwrap();

    assert_eq!(first.len(), 2);
    // Same shared value, not a refetch
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    // Unnamed stop got the sentinel on the way through
    assert_eq!(first[1].name(), "(Unnamed)");

    server.verify().await;
}

#[tokio::test]
async fn stops_cache_expires_after_ttl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOPS_JSON))
        .expect(2)
        .mount(&server)
        .await;

    let config = CacheConfig {
        stops: CachePolicy::new(Duration::from_millis(50), 16),
        ..CacheConfig::default()
    };
    let cached = CachedBustimeClient::new(client_for(&server), &config);
    let rt = RouteId::from("28X");

    cached.stops(&rt, Direction::Inbound).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    cached.stops(&rt, Direction::Inbound).await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn concurrent_misses_single_flight() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(STOPS_JSON)
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let rt = RouteId::from("28X");

    let lookups = (0..8).map(|_| cached.stops(&rt, Direction::Inbound));
    let results = futures::future::join_all(lookups).await;

    for result in results {
        assert_eq!(result.unwrap().len(), 2);
    }
    server.verify().await;
}

#[tokio::test]
async fn failed_load_releases_flight_group() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOPS_JSON))
        .expect(1)
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let rt = RouteId::from("28X");

    assert!(cached.stops(&rt, Direction::Inbound).await.is_err());
    // The failure was not cached; the retry fetches and succeeds.
    let stops = cached.stops(&rt, Direction::Inbound).await.unwrap();
    assert_eq!(stops.len(), 2);
}

#[tokio::test]
async fn registry_fetches_route_list_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getroutes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ROUTES_JSON))
        .expect(1)
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let registry = RouteRegistry::new();

    let flyer = registry
        .get(&cached, &RouteId::from("28X"))
        .await
        .unwrap()
        .expect("28X is tracked");
    assert_eq!(flyer.name, "AIRPORT FLYER");
    assert_eq!(flyer.color.as_deref(), Some("#b22222"));

    let bellevue = registry.get(&cached, &RouteId::from("13")).await.unwrap();
    assert!(bellevue.is_some());

    // Unknown designator is a None, not an error, and costs no fetch
    let missing = registry.get(&cached, &RouteId::from("99Z")).await.unwrap();
    assert!(missing.is_none());

    server.verify().await;
}

#[tokio::test]
async fn registry_concurrent_first_access_single_flights() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getroutes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ROUTES_JSON)
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let registry = RouteRegistry::new();

    let rt = RouteId::from("28X");
    let lookups = (0..6).map(|_| registry.get(&cached, &rt));
    for result in futures::future::join_all(lookups).await {
        assert!(result.unwrap().is_some());
    }

    server.verify().await;
}

#[tokio::test]
async fn route_stop_lists_pin_after_first_resolution() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOPS_JSON))
        .expect(1)
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let route = bustime_client::domain::Route::new(
        RouteId::from("28X"),
        "AIRPORT FLYER".into(),
        None,
    );

    route.stops(&cached, Direction::Inbound).await.unwrap();

    // Even with every whole-response cache dropped, the instance keeps
    // its resolved list; only a new Route instance refetches.
    cached.invalidate_all();
    let again = route.stops(&cached, Direction::Inbound).await.unwrap();
    assert_eq!(again.len(), 2);

    server.verify().await;
}

#[tokio::test]
async fn prediction_vehicle_degrades_to_offline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getpredictions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PREDICTIONS_JSON))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/getvehicles"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_DATA_JSON))
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let predictions = cached
        .predictions(&PredictionQuery::for_stops([StopId::from("4123")]))
        .await
        .unwrap();
    assert_eq!(predictions.len(), 1);

    let state = predictions[0].vehicle(&cached).await.unwrap();
    assert!(state.is_offline());
    assert_eq!(state.id().as_str(), "5666");

    // Cached on the instance: a second access is the same resolution
    let again = predictions[0].vehicle(&cached).await.unwrap();
    assert!(std::ptr::eq(state, again));
}

#[tokio::test]
async fn vehicle_update_is_atomic_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getvehicles"))
        .and(query_param("vid", "5666"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SINGLE_VEHICLE_JSON))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/getvehicles"))
        .and(query_param("vid", "5666"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_DATA_JSON))
        .mount(&server)
        .await;

    let cached = cached_client_for(&server);
    let mut vehicles = cached
        .vehicles(&VehicleQuery::by_ids([VehicleId::from("5666")]))
        .await
        .unwrap();
    let mut vehicle = vehicles.pop().unwrap();

    let before_destination = vehicle.destination.clone();
    let before_reported = vehicle.last_reported;

    // Second fetch reports the vehicle gone; the object must not change.
    let err = vehicle.update(&cached).await.unwrap_err();
    assert!(err.is_no_data());
    assert_eq!(vehicle.destination, before_destination);
    assert_eq!(vehicle.last_reported, before_reported);
}

#[tokio::test]
async fn system_time_round_trips() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gettime"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"bustime-response": {"tm": "20140925 22:46:33"}}"#,
        ))
        .mount(&server)
        .await;

    let time = client_for(&server).system_time().await.unwrap();
    assert_eq!(
        time.format("%Y-%m-%d %H:%M:%S").to_string(),
        "2014-09-25 22:46:33"
    );
}
