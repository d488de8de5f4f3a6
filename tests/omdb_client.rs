use std::time::Duration;

use cinecache::{
    error::FetchError,
    models::FilmId,
    omdb::{OmdbClient, RemoteMetadataClient},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn client(server: &MockServer, api_key: &str) -> OmdbClient {
    let http = reqwest::Client::builder().timeout(Duration::from_millis(500)).build().unwrap();
    OmdbClient::new(http, api_key.to_string(), server.uri(), 100)
}

fn film_id(raw: &str) -> FilmId {
    FilmId::parse(raw).unwrap()
}

fn dark_knight() -> serde_json::Value {
    json!({
        "Title": "The Dark Knight",
        "Year": "2008",
        "Rated": "PG-13",
        "Released": "18 Jul 2008",
        "Runtime": "152 min",
        "Genre": "Action, Crime, Drama",
        "Director": "Christopher Nolan",
        "Writer": "Jonathan Nolan, Christopher Nolan",
        "Actors": "Christian Bale, Heath Ledger, Aaron Eckhart",
        "Plot": "Batman faces the Joker.",
        "Language": "English, Mandarin",
        "Country": "United States, United Kingdom",
        "Awards": "Won 2 Oscars.",
        "Poster": "https://example.com/poster.jpg",
        "Ratings": [
            { "Source": "Internet Movie Database", "Value": "9.0/10" },
            { "Source": "Metacritic", "Value": "N/A" }
        ],
        "Metascore": "84",
        "imdbRating": "9.0",
        "imdbVotes": "2,900,000",
        "imdbID": "tt0468569",
        "Type": "movie",
        "DVD": "N/A",
        "BoxOffice": "$534,987,076",
        "Production": "N/A",
        "Website": "N/A",
        "Response": "True"
    })
}

#[tokio::test]
async fn fetch_maps_fields_and_drops_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("apikey", "secret"))
        .and(query_param("i", "tt0468569"))
        .and(query_param("plot", "full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dark_knight()))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server, "secret").fetch(&film_id("tt0468569")).await.unwrap();
    let meta = &record.metadata;

    assert_eq!(record.id.as_str(), "tt0468569");
    assert_eq!(meta.title.as_deref(), Some("The Dark Knight"));
    assert_eq!(meta.release_year(), Some(2008));
    assert_eq!(meta.genres(), vec!["Action", "Crime", "Drama"]);
    assert_eq!(meta.imdb_rating.as_deref(), Some("9.0"));
    assert_eq!(meta.kind.as_deref(), Some("movie"));
    assert_eq!(meta.production, None);
    assert_eq!(meta.website, None);
    assert_eq!(meta.ratings.len(), 1);
    assert_eq!(record.schema_version, cinecache::models::SCHEMA_VERSION);
}

#[tokio::test]
async fn fetch_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "Response": "False", "Error": "Movie not found!" })),
        )
        .mount(&server)
        .await;

    let err = client(&server, "secret").fetch(&film_id("tt0000000")).await.unwrap_err();
    assert_eq!(err, FetchError::NotFound(film_id("tt0000000")));
}

#[tokio::test]
async fn fetch_classifies_key_and_quota_errors() {
    let cases = [
        ("Invalid API key!", FetchError::AuthInvalid),
        ("Request limit reached!", FetchError::RateLimited),
    ];
    for (message, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "Response": "False", "Error": message })),
            )
            .mount(&server)
            .await;

        let err = client(&server, "secret").fetch(&film_id("tt0468569")).await.unwrap_err();
        assert_eq!(err, expected, "{message}");
    }
}

#[tokio::test]
async fn fetch_maps_http_status() {
    let cases = [
        (429, "rate_limited"),
        (403, "auth_invalid"),
        (500, "transient"),
        (503, "transient"),
        (404, "malformed_response"),
    ];
    for (status, kind) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream trouble"))
            .mount(&server)
            .await;

        let err = client(&server, "secret").fetch(&film_id("tt0468569")).await.unwrap_err();
        assert_eq!(err.kind(), kind, "status {status}");
    }
}

#[tokio::test]
async fn fetch_rejects_malformed_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server, "secret").fetch(&film_id("tt0468569")).await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)));
}

#[tokio::test]
async fn fetch_rejects_mismatched_identifier() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dark_knight()))
        .mount(&server)
        .await;

    let err = client(&server, "secret").fetch(&film_id("tt0113277")).await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)));
}

#[tokio::test]
async fn fetch_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(dark_knight())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client(&server, "secret").fetch(&film_id("tt0468569")).await.unwrap_err();
    assert!(matches!(err, FetchError::Transient(_)));
}

#[tokio::test]
async fn missing_key_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dark_knight()))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, "  ").fetch(&film_id("tt0468569")).await.unwrap_err();
    assert_eq!(err, FetchError::AuthInvalid);
}

#[tokio::test]
async fn search_returns_page_with_totals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("s", "dark knight"))
        .and(query_param("page", "2"))
        .and(query_param("type", "movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Search": [
                {
                    "Title": "The Dark Knight",
                    "Year": "2008",
                    "imdbID": "tt0468569",
                    "Type": "movie",
                    "Poster": "N/A"
                },
                {
                    "Title": "The Dark Knight Rises",
                    "Year": "2012",
                    "imdbID": "tt1345836",
                    "Type": "movie",
                    "Poster": "https://example.com/p.jpg"
                }
            ],
            "totalResults": "23",
            "Response": "True"
        })))
        .mount(&server)
        .await;

    let page = client(&server, "secret").search("  dark knight ", 2).await.unwrap();

    assert_eq!(page.query, "dark knight");
    assert_eq!(page.page, 2);
    assert_eq!(page.total_results, 23);
    assert_eq!(page.total_pages(), 3);
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[0].poster, None);
    assert_eq!(page.results[1].id.as_str(), "tt1345836");
}

#[tokio::test]
async fn search_without_matches_is_an_empty_page() {
    for message in ["Movie not found!", "Too many results."] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "Response": "False", "Error": message })),
            )
            .mount(&server)
            .await;

        let page = client(&server, "secret").search("zzzz", 1).await.unwrap();
        assert_eq!(page.total_results, 0);
        assert!(page.results.is_empty());
    }
}

#[tokio::test]
async fn blank_search_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let omdb = client(&server, "secret");
    assert!(omdb.search("   ", 1).await.unwrap().results.is_empty());
    assert!(omdb.search("heat", 0).await.unwrap().results.is_empty());
}

#[tokio::test]
async fn search_skips_hits_without_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("s", "heat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Search": [
                { "Year": "1995", "imdbID": "tt9999999", "Type": "movie" },
                { "Title": "N/A", "Year": "1995", "imdbID": "tt9999998", "Type": "movie" },
                { "Title": "Heat", "Year": "1995", "imdbID": "tt0113277", "Type": "movie" }
            ],
            "totalResults": "3",
            "Response": "True"
        })))
        .mount(&server)
        .await;

    let page = client(&server, "secret").search("heat", 1).await.unwrap();

    assert_eq!(page.total_results, 3);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id.as_str(), "tt0113277");
    assert_eq!(page.results[0].title, "Heat");
}
