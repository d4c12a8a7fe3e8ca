use chrono::{Duration, Utc};
use perp_trader_binance::{
    BinanceClientConfig, BinanceError, BinanceFuturesClient, RequestSigner, API_KEY_HEADER,
};
use perp_trader_core::{ExchangeHistory, FillSide, PositionSide};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const API_KEY: &str = "test-api-key";
const SECRET: &str = "test-secret";

/// Matches requests whose `signature` is the HMAC of everything before it.
struct ValidSignature;

impl Match for ValidSignature {
    fn matches(&self, request: &Request) -> bool {
        let Some(query) = request.url.query() else {
            return false;
        };
        let Some((signed, signature)) = query.rsplit_once("&signature=") else {
            return false;
        };
        let signer = RequestSigner::new(API_KEY, SECRET).unwrap();
        signed.contains("timestamp=")
            && signed.contains("recvWindow=")
            && signer.sign(signed).unwrap() == signature
    }
}

fn client(server: &MockServer, page_limit: u32) -> BinanceFuturesClient {
    let signer = RequestSigner::new(API_KEY, SECRET).unwrap();
    let config = BinanceClientConfig::default()
        .with_base_url(server.uri())
        .with_page_limit(page_limit);
    BinanceFuturesClient::new(config, signer).unwrap()
}

fn trade(id: u64, symbol: &str, side: &str, position_side: &str, time: i64) -> Value {
    json!({
        "buyer": side == "BUY",
        "commission": "0.04",
        "commissionAsset": "USDT",
        "id": id,
        "maker": false,
        "orderId": id * 10,
        "price": "100.0",
        "qty": "1.000",
        "quoteQty": "100.0",
        "realizedPnl": "0",
        "side": side,
        "positionSide": position_side,
        "symbol": symbol,
        "time": time,
    })
}

#[tokio::test]
async fn test_user_trades_signed_and_decoded() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let t0 = (now - Duration::hours(2)).timestamp_millis();

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .and(query_param("symbol", "BTCUSDT"))
        .and(query_param("limit", "1000"))
        .and(header(API_KEY_HEADER, API_KEY))
        .and(ValidSignature)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            trade(2, "BTCUSDT", "SELL", "LONG", t0 + 1_000),
            trade(1, "BTCUSDT", "BUY", "LONG", t0),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let fills = client(&server, 1000)
        .user_trades("BTCUSDT", now - Duration::days(1), now)
        .await
        .unwrap();

    assert_eq!(fills.len(), 2);
    assert_eq!(fills[0].time_ms, t0);
    assert_eq!(fills[0].side, FillSide::Buy);
    assert_eq!(fills[1].position_side, PositionSide::Long);
    assert!((fills[1].commission - 0.04).abs() < 1e-12);
}

#[tokio::test]
async fn test_long_lookback_split_into_windows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let now = Utc::now();
    let fills = client(&server, 1000)
        .user_trades("ETHUSDT", now - Duration::days(10), now)
        .await
        .unwrap();
    assert!(fills.is_empty());
}

#[tokio::test]
async fn test_full_page_continues_with_from_id() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let t0 = (now - Duration::hours(3)).timestamp_millis();

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .and(query_param("fromId", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            trade(3, "BTCUSDT", "SELL", "LONG", t0 + 2_000),
        ])))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            trade(1, "BTCUSDT", "BUY", "LONG", t0),
            trade(2, "BTCUSDT", "BUY", "LONG", t0 + 1_000),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let fills = client(&server, 2)
        .user_trades("BTCUSDT", now - Duration::days(1), now)
        .await
        .unwrap();

    assert_eq!(fills.len(), 3);
    assert_eq!(fills[2].side, FillSide::Sell);
}

#[tokio::test]
async fn test_api_error_body_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"code": -1121, "msg": "Invalid symbol."})),
        )
        .mount(&server)
        .await;

    let now = Utc::now();
    let err = client(&server, 1000)
        .user_trades("NOPE", now - Duration::days(1), now)
        .await
        .unwrap_err();

    match err {
        BinanceError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, -1121);
            assert_eq!(message, "Invalid symbol.");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_maps_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let now = Utc::now();
    let err = client(&server, 1000)
        .user_trades("BTCUSDT", now - Duration::days(1), now)
        .await
        .unwrap_err();

    assert!(matches!(err, BinanceError::RateLimited { retry_after_secs: 7 }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_all_fills_discovers_symbols_from_income() {
    let server = MockServer::start().await;
    let t0 = (Utc::now() - Duration::hours(1)).timestamp_millis();

    Mock::given(method("GET"))
        .and(path("/fapi/v1/income"))
        .and(query_param("incomeType", "REALIZED_PNL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"symbol": "BTCUSDT", "incomeType": "REALIZED_PNL", "income": "1.5", "asset": "USDT", "time": t0, "tranId": 1, "tradeId": "11"},
            {"symbol": "ETHUSDT", "incomeType": "REALIZED_PNL", "income": "-0.5", "asset": "USDT", "time": t0, "tranId": 2, "tradeId": "12"},
            {"symbol": "BTCUSDT", "incomeType": "REALIZED_PNL", "income": "0.2", "asset": "USDT", "time": t0, "tranId": 3, "tradeId": "13"},
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            trade(1, "BTCUSDT", "BUY", "LONG", t0 - 1_000),
            trade(2, "BTCUSDT", "SELL", "LONG", t0),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .and(query_param("symbol", "ETHUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let history = client(&server, 1000).all_fills(1).await.unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history["BTCUSDT"].len(), 2);
}

#[tokio::test]
async fn test_history_trait_wraps_errors_with_symbol() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fapi/v1/userTrades"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client(&server, 1000).fills("SOLUSDT", 1).await.unwrap_err();
    assert!(format!("{err:#}").contains("SOLUSDT"));
    assert!(format!("{err:#}").contains("upstream down"));
}
