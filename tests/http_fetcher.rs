use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use scraper::Html;
use tcam_scraper::{
    DocumentFetcher, ScrapeError, fetcher::FetchRequest, indicator_scraper::scrape_differential,
    pipeline, rate_scraper::build_rate_scrape, requests::RequestClient,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const RATES_PAGE: &str = include_str!("fixtures/rates_page.html");

fn rates_request_to(server: &MockServer, date: NaiveDate) -> FetchRequest {
    let mut request = pipeline::rates_request(date);
    request.url = format!("{}/historico", server.uri());
    request
}

#[tokio::test]
async fn sends_the_date_as_a_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/historico"))
        .and(query_param("initialDate", "31/05/2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RATES_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = RequestClient::new(Duration::from_secs(5)).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
    let body = client.fetch(&rates_request_to(&server, date)).await.unwrap();

    let scrape = build_rate_scrape(&Html::parse_document(&body), date)
        .unwrap()
        .unwrap();
    assert_eq!(scrape.record.closing, 5234.1);
}

#[tokio::test]
async fn unsuccessful_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut client = RequestClient::new(Duration::from_secs(5)).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
    let err = client
        .fetch(&rates_request_to(&server, date))
        .await
        .unwrap_err();

    match err {
        ScrapeError::Status { source_name, status } => {
            assert_eq!(source_name, "rates 31/05/2024");
            assert_eq!(status, 503);
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RATES_PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut client = RequestClient::new(Duration::from_millis(200)).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
    let err = client
        .fetch(&rates_request_to(&server, date))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Timeout { .. }), "{err:?}");
}

#[tokio::test]
async fn plain_http_cannot_see_script_rendered_indicators() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indicadores"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><app-root></app-root></body></html>"),
        )
        .mount(&server)
        .await;

    let mut client = RequestClient::new(Duration::from_secs(5)).unwrap();
    assert!(!client.runs_scripts());

    let mut request = pipeline::differential_request();
    request.url = format!("{}/indicadores", server.uri());
    let body = client.fetch(&request).await.unwrap();
    let parsed = scrape_differential(&Html::parse_document(&body)).unwrap();
    assert!(parsed.is_none());
}
