//! Mock stock data API for integration testing
//!
//! This binary implements a small in-memory version of the graded service
//! so the grader can be exercised end-to-end without a database.
//!
//! Usage: `mock_stock_api [ADDR]` (default `127.0.0.1:0`). The bound address
//! is printed as `mock stock api listening at: ADDR`. The accepted API key is
//! read from `MOCK_API_KEY` (default `test-key`).

use api_grader::model::{AccountRef, BacktestRequest, NewAccount, StockPosition};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const API_KEY_HEADER: &str = "DATA-241-API-KEY";
const DEFAULT_API_KEY: &str = "test-key";

const SYMBOLS: [&str; 5] = ["AAPL", "AMZN", "GOOG", "IBM", "MSFT"];
const FIRST_YEAR: u16 = 2000;
const LAST_YEAR: u16 = 2020;
const ROWS_PER_SYMBOL: usize = 5283;

/// Closing prices used to compute account returns
const CLOSES: [(&str, &str, f64); 6] = [
    ("MSFT", "2018-02-20", 92.72),
    ("MSFT", "2019-02-20", 108.40),
    ("AAPL", "2016-10-19", 117.12),
    ("AAPL", "2016-10-27", 116.3075),
    ("IBM", "2016-09-08", 159.0),
    ("IBM", "2016-09-14", 155.5),
];

type Shared = Arc<Mutex<MockState>>;

#[tokio::main]
async fn main() {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:0".to_string());
    let api_key = std::env::var("MOCK_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Ok(local) = listener.local_addr() {
        println!("mock stock api listening at: {local}");
        std::io::stdout().flush().ok();
    }

    let state = Arc::new(Mutex::new(MockState::new(api_key)));
    if let Err(e) = axum::serve(listener, build_router(state)).await {
        eprintln!("mock stock api stopped: {e}");
        std::process::exit(1);
    }
}

fn build_router(state: Shared) -> Router {
    let open = Router::new()
        .route("/api/v1/row_count", get(row_count))
        .route("/api/v1/unique_stock_count", get(unique_stock_count))
        .route("/api/v1/row_by_market_count", get(row_by_market_count));

    let protected = Router::new()
        .route("/api/v2/:part", get(year_count))
        .route("/api/v2/:part/:symbol", get(price_series))
        .route(
            "/api/v3/accounts",
            get(list_accounts).post(create_account).delete(delete_account),
        )
        .route("/api/v3/accounts/:id", get(account_holdings))
        .route("/api/v3/accounts/return/:id", get(account_return))
        .route("/api/v3/stocks", post(add_stock).delete(delete_stock))
        .route("/api/v3/stocks/:symbol", get(stock_holdings))
        .route("/api/v4/back_test", post(back_test))
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    open.merge(protected).with_state(state)
}

async fn require_api_key(
    State(state): State<Shared>,
    headers: HeaderMap,
    req: Request<Body>,
    next: Next,
) -> Response {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    let accepted = provided == Some(lock(&state).api_key.as_str());
    if !accepted {
        return error(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
    }
    next.run(req).await
}

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn not_found(what: &str) -> Response {
    error(StatusCode::NOT_FOUND, &format!("{what} not found"))
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

struct Position {
    symbol: String,
    purchase_date: String,
    sale_date: String,
    number_of_shares: u64,
}

impl Position {
    fn same_lot(&self, other: &StockPosition) -> bool {
        self.symbol == other.symbol
            && self.purchase_date == other.purchase_date
            && self.sale_date == other.sale_date
            && self.number_of_shares == other.number_of_shares
    }

    fn gain(&self) -> f64 {
        match (
            close_on(&self.symbol, &self.purchase_date),
            close_on(&self.symbol, &self.sale_date),
        ) {
            (Some(bought), Some(sold)) => (sold - bought) * self.number_of_shares as f64,
            _ => 0.0,
        }
    }
}

impl From<StockPosition> for Position {
    fn from(position: StockPosition) -> Self {
        Self {
            symbol: position.symbol,
            purchase_date: position.purchase_date,
            sale_date: position.sale_date,
            number_of_shares: position.number_of_shares,
        }
    }
}

fn close_on(symbol: &str, date: &str) -> Option<f64> {
    CLOSES
        .iter()
        .find(|(s, d, _)| *s == symbol && *d == date)
        .map(|(_, _, price)| *price)
}

struct Account {
    name: String,
    holdings: Vec<Position>,
}

struct MockState {
    api_key: String,
    next_account_id: u64,
    accounts: BTreeMap<u64, Account>,
}

impl MockState {
    fn new(api_key: String) -> Self {
        Self {
            api_key,
            next_account_id: 1,
            accounts: BTreeMap::new(),
        }
    }
}

// === v1 ===

async fn row_count() -> Response {
    ok(json!({ "row_count": SYMBOLS.len() * ROWS_PER_SYMBOL }))
}

async fn unique_stock_count() -> Response {
    ok(json!({ "unique_stock_count": SYMBOLS.len() }))
}

async fn row_by_market_count() -> Response {
    ok(json!({ "NASDAQ": 4 * ROWS_PER_SYMBOL, "NYSE": ROWS_PER_SYMBOL }))
}

// === v2 ===

async fn year_count(Path(year): Path<String>) -> Response {
    match year.parse::<u16>() {
        Ok(y) if (FIRST_YEAR..=LAST_YEAR).contains(&y) => {
            ok(json!({ "year": y, "count": 252 * SYMBOLS.len() }))
        }
        _ => not_found("year"),
    }
}

async fn price_series(Path((field, symbol)): Path<(String, String)>) -> Response {
    let offset = match field.as_str() {
        "open" => 0.0,
        "close" => 0.5,
        "high" => 1.25,
        "low" => -1.0,
        _ => return not_found("price field"),
    };
    if !SYMBOLS.contains(&symbol.as_str()) {
        return not_found("symbol");
    }
    let price_info: Vec<Value> = ["2020-01-02", "2020-01-03", "2020-01-06"]
        .iter()
        .enumerate()
        .map(|(i, date)| json!({ "date": date, field.as_str(): 100.0 + i as f64 + offset }))
        .collect();
    ok(json!({ "symbol": symbol, "price_info": price_info }))
}

// === v3 ===

async fn list_accounts(State(state): State<Shared>) -> Response {
    let accounts: Vec<Value> = lock(&state)
        .accounts
        .iter()
        .map(|(id, account)| json!({ "account_id": id, "name": account.name }))
        .collect();
    ok(Value::Array(accounts))
}

async fn create_account(
    State(state): State<Shared>,
    Json(request): Json<NewAccount>,
) -> Response {
    let mut state = lock(&state);
    let account_id = state.next_account_id;
    state.next_account_id += 1;
    state.accounts.insert(
        account_id,
        Account {
            name: request.name,
            holdings: Vec::new(),
        },
    );
    (StatusCode::CREATED, Json(json!({ "account_id": account_id }))).into_response()
}

async fn delete_account(
    State(state): State<Shared>,
    Json(request): Json<AccountRef>,
) -> Response {
    match lock(&state).accounts.remove(&request.account_id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found("account"),
    }
}

async fn account_holdings(State(state): State<Shared>, Path(id): Path<u64>) -> Response {
    let state = lock(&state);
    let Some(account) = state.accounts.get(&id) else {
        return not_found("account");
    };
    let holdings: Vec<Value> = account
        .holdings
        .iter()
        .map(|p| {
            json!({
                "symbol": p.symbol,
                "purchase_date": p.purchase_date,
                "sale_date": p.sale_date,
                "number_of_shares": p.number_of_shares,
            })
        })
        .collect();
    ok(json!({
        "account_id": id,
        "name": account.name,
        "stock_holdings": holdings,
    }))
}

async fn account_return(State(state): State<Shared>, Path(id): Path<u64>) -> Response {
    let state = lock(&state);
    let Some(account) = state.accounts.get(&id) else {
        return not_found("account");
    };
    let total: f64 = account.holdings.iter().map(Position::gain).sum();
    ok(json!({ "account_id": id, "return": total }))
}

async fn add_stock(
    State(state): State<Shared>,
    Json(request): Json<StockPosition>,
) -> Response {
    if request.number_of_shares == 0 {
        return error(StatusCode::BAD_REQUEST, "number_of_shares must be at least 1");
    }
    if !SYMBOLS.contains(&request.symbol.as_str()) {
        return not_found("symbol");
    }
    let mut state = lock(&state);
    let Some(account) = state.accounts.get_mut(&request.account_id) else {
        return not_found("account");
    };
    account.holdings.push(request.into());
    StatusCode::CREATED.into_response()
}

async fn delete_stock(
    State(state): State<Shared>,
    Json(request): Json<StockPosition>,
) -> Response {
    let mut state = lock(&state);
    let Some(account) = state.accounts.get_mut(&request.account_id) else {
        return not_found("account");
    };
    match account.holdings.iter().position(|p| p.same_lot(&request)) {
        Some(index) => {
            account.holdings.remove(index);
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found("holding"),
    }
}

async fn stock_holdings(State(state): State<Shared>, Path(symbol): Path<String>) -> Response {
    let state = lock(&state);
    let mut holdings = Vec::new();
    for (id, account) in &state.accounts {
        for p in account.holdings.iter().filter(|p| p.symbol == symbol) {
            holdings.push(json!({
                "account_id": id,
                "purchase_date": p.purchase_date,
                "sale_date": p.sale_date,
                "number_of_shares": p.number_of_shares,
            }));
        }
    }
    ok(json!({ "symbol": symbol, "holdings": holdings }))
}

// === v4 ===

async fn back_test(Json(request): Json<BacktestRequest>) -> Response {
    let first_day = format!("{FIRST_YEAR}-01-01");
    if request.start_date < first_day || request.end_date < request.start_date {
        return error(
            StatusCode::BAD_REQUEST,
            "No trading data in the requested range",
        );
    }
    ok(json!({ "return": 2188.4675, "num_observations": 2033 }))
}
