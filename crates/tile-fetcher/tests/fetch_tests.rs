//! Integration tests for per-tile fetching against a canned transport.

use std::sync::Arc;
use std::time::Duration;

use fourwings_common::{chunk_for_at, frame_indices_for, Interval, Sublayer, TimeRange};
use fourwings_parser::SparseSeries;
use test_utils::{
    bins_header, encode_cells, fishing_sublayer, metadata_headers, presence_sublayer, sample_tile, utc, CellRecord,
    TILES_URL,
};
use tile_fetcher::{
    CancellationToken, FetchContext, FetchError, StaticTransport, TileFetcher, TileResponse, DEFAULT_CHUNK_ERROR,
};

const FISHING: &str = "public-global-fishing-effort";
const PRESENCE: &str = "public-global-presence";

fn context(sublayers: Vec<Sublayer>) -> FetchContext {
    let now = utc(2025, 1, 1);
    let chunk = chunk_for_at(utc(2024, 1, 10), utc(2024, 2, 20), now);
    FetchContext::new(chunk, sublayers, now)
}

fn tile_start_frame(context: &FetchContext) -> u64 {
    Interval::Day.frame(context.chunk.buffered_start).ceil() as u64
}

fn fishing_response(context: &FetchContext) -> TileResponse {
    let records = vec![CellRecord::new(5, tile_start_frame(context) + 70, vec![10, 20, 30])];
    let mut headers = metadata_headers(10, 10, 0.5, 0.0);
    headers.push(bins_header(&[2.0, 4.0]));
    TileResponse::new(200, encode_cells(&records)).with_headers(headers)
}

fn fetcher(transport: StaticTransport) -> (TileFetcher, Arc<StaticTransport>) {
    let transport = Arc::new(transport);
    (TileFetcher::new(transport.clone(), vec![TILES_URL.to_string()]), transport)
}

// ============================================================================
// Successful loads
// ============================================================================

#[tokio::test]
async fn test_missing_sublayer_is_empty() {
    let context = context(vec![fishing_sublayer(), presence_sublayer()]);
    let (fetcher, transport) = fetcher(StaticTransport::new().route(FISHING, fishing_response(&context)));

    let fetched = fetcher
        .fetch_tile(sample_tile(), &context, &CancellationToken::new())
        .await
        .unwrap()
        .expect("tile should load");

    assert_eq!(transport.requests().len(), 2);
    assert_eq!(fetched.decoded.sublayers, 2);
    assert_eq!((fetched.decoded.cols, fetched.decoded.rows), (10, 10));

    let cell = fetched.decoded.cell(5).expect("cell 5");
    assert_eq!(cell.series[0], Some(SparseSeries::new(70, vec![5.0, 10.0, 15.0])));
    assert_eq!(cell.series[1], None);
    assert_eq!(fetched.bins, Some(vec![1.0, 2.0]));
}

#[tokio::test]
async fn test_hidden_sublayers_are_not_requested() {
    let context = context(vec![fishing_sublayer(), presence_sublayer().hidden()]);
    let (fetcher, transport) = fetcher(StaticTransport::new().route(FISHING, fishing_response(&context)));

    let fetched = fetcher
        .fetch_tile(sample_tile(), &context, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains(FISHING));
    assert!(requests[0].contains("/heatmap/2/1/1?"));
    assert_eq!(fetched.decoded.sublayers, 1);
}

#[tokio::test]
async fn test_initial_values_are_precomputed() {
    let mut context = context(vec![fishing_sublayer()]);
    let range = TimeRange::new(utc(2024, 1, 10), utc(2024, 2, 20));
    context.initial_time_range = Some(range);
    let (fetcher, _) = fetcher(StaticTransport::new().route(FISHING, fishing_response(&context)));

    let fetched = fetcher
        .fetch_tile(sample_tile(), &context, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    let key = frame_indices_for(Interval::Day, range.start, range.end, context.chunk.buffered_start).time_range_key();
    let cell = fetched.decoded.cell(5).unwrap();
    assert_eq!(cell.initial_values.get(&key), Some(&vec![30.0]));
}

#[test]
fn test_all_missing_yields_empty_tile() {
    let context = context(vec![fishing_sublayer()]);
    let (fetcher, _) = fetcher(StaticTransport::new());

    let fetched = tokio_test::block_on(fetcher.fetch_tile(sample_tile(), &context, &CancellationToken::new()))
        .unwrap()
        .unwrap();
    assert!(fetched.decoded.is_empty());
    assert_eq!(fetched.bins, None);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_server_error_fails_tile_with_status_text() {
    let context = context(vec![fishing_sublayer(), presence_sublayer()]);
    let (fetcher, _) = fetcher(
        StaticTransport::new()
            .route(FISHING, fishing_response(&context))
            .route(PRESENCE, TileResponse::new(500, bytes::Bytes::new())),
    );

    let result = fetcher
        .fetch_tile(sample_tile(), &context, &CancellationToken::new())
        .await;
    assert_eq!(result.unwrap_err(), FetchError::Tile("Internal Server Error".to_string()));
}

#[tokio::test]
async fn test_failure_without_status_text_uses_default_message() {
    let context = context(vec![fishing_sublayer()]);
    let (fetcher, _) = fetcher(
        StaticTransport::new().route(FISHING, TileResponse::new(503, bytes::Bytes::new()).with_status_text("")),
    );

    let err = fetcher
        .fetch_tile(sample_tile(), &context, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), DEFAULT_CHUNK_ERROR);
}

#[tokio::test]
async fn test_malformed_payload_is_decode_error() {
    let context = context(vec![fishing_sublayer()]);
    let (fetcher, _) = fetcher(
        StaticTransport::new().route(FISHING, TileResponse::new(200, bytes::Bytes::from_static(&[0x0a, 0x05, 0x01]))),
    );

    let err = fetcher
        .fetch_tile(sample_tile(), &context, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn test_missing_template_is_invalid_url() {
    let context = context(vec![fishing_sublayer()]);
    let fetcher = TileFetcher::new(Arc::new(StaticTransport::new()), Vec::new());
    let err = fetcher
        .fetch_tile(sample_tile(), &context, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_start() {
    let context = context(vec![fishing_sublayer()]);
    let (fetcher, transport) = fetcher(StaticTransport::new().route(FISHING, fishing_response(&context)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = fetcher.fetch_tile(sample_tile(), &context, &cancel).await.unwrap();
    assert!(result.is_none());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_while_in_flight() {
    let context = context(vec![fishing_sublayer(), presence_sublayer()]);
    let (fetcher, transport) = fetcher(
        StaticTransport::new()
            .route(PRESENCE, TileResponse::new(500, bytes::Bytes::new()))
            .with_delay(Duration::from_secs(30)),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = fetcher.fetch_tile(sample_tile(), &context, &cancel).await;
    assert!(matches!(result, Ok(None)));
    assert_eq!(transport.requests().len(), 2);
}
