//! Step sequences of each suite
//!
//! Steps inside a suite run strictly in order: later steps use identifiers
//! and rows produced by earlier ones.

use crate::model::{
    encode, AccountCreated, AccountHoldings, AccountRef, AccountReturn, BacktestRequest,
    BacktestResult, NewAccount, StockPosition,
};
use crate::schema::{PriceField, ResponseSchema};
use tracing::debug;

use super::config::{EndpointCall, Suite};
use super::runner::{CreatedAccounts, RunContext, ScenarioRunner};

/// Key sent by the bad-key probe
pub const INVALID_API_KEY: &str = "INVALID_KEY";

const VALID_YEARS: [u16; 3] = [2019, 2011, 2015];
const INVALID_YEARS: [u16; 2] = [1800, 1900];

const VALID_PRICE_CASES: [(PriceField, &str); 4] = [
    (PriceField::Open, "AAPL"),
    (PriceField::Close, "GOOG"),
    (PriceField::High, "MSFT"),
    (PriceField::Low, "AMZN"),
];
const INVALID_PRICE_CASES: [(PriceField, &str); 4] = [
    (PriceField::Open, "INVALID1"),
    (PriceField::Close, "INVALID2"),
    (PriceField::High, "XYZ"),
    (PriceField::Low, "ABC"),
];

const BACKTEST_DATE: &str = "2020-01-03";

/// Run every step of `suite`
pub async fn run(runner: &mut ScenarioRunner<'_>, suite: Suite) {
    match suite {
        Suite::V1 => run_v1(runner).await,
        Suite::V2 => run_v2(runner).await,
        Suite::V3 => run_v3(runner).await,
        Suite::V4 => run_v4(runner).await,
        Suite::InvalidKey => run_invalid_key(runner).await,
        Suite::AccountReturns => run_account_returns(runner).await,
        Suite::BacktestExact => run_backtest_exact(runner).await,
    }
}

async fn run_v1(runner: &mut ScenarioRunner<'_>) {
    let endpoints = [
        ("/api/v1/row_by_market_count", ResponseSchema::RowByMarketCount),
        ("/api/v1/row_count", ResponseSchema::RowCount),
        ("/api/v1/unique_stock_count", ResponseSchema::UniqueStockCount),
    ];
    for (path, schema) in endpoints {
        runner.test_endpoint(EndpointCall::get(path).schema(schema)).await;
    }
}

async fn run_v2(runner: &mut ScenarioRunner<'_>) {
    run_invalid_key(runner).await;

    for year in VALID_YEARS {
        runner
            .test_endpoint(
                EndpointCall::get(format!("/api/v2/{year}")).schema(ResponseSchema::YearCount),
            )
            .await;
    }
    for year in INVALID_YEARS {
        runner
            .test_endpoint(EndpointCall::get(format!("/api/v2/{year}")).expect([404]))
            .await;
    }

    for (field, symbol) in VALID_PRICE_CASES {
        let path = format!("/api/v2/{}/{symbol}", field.as_str());
        runner
            .test_endpoint(EndpointCall::get(path).schema(ResponseSchema::Price(field)))
            .await;
    }
    for (field, symbol) in INVALID_PRICE_CASES {
        let path = format!("/api/v2/{}/{symbol}", field.as_str());
        runner.test_endpoint(EndpointCall::get(path).expect([404])).await;
    }
}

async fn run_invalid_key(runner: &mut ScenarioRunner<'_>) {
    runner.section("Testing invalid key");
    let invalid = runner.transport().with_api_key(INVALID_API_KEY);
    runner
        .test_endpoint_via(invalid.as_ref(), EndpointCall::get("/api/v2/2019").expect([401]))
        .await;
}

/// Holdings added by v3: (which account, position template)
fn v3_positions(accounts: CreatedAccounts) -> [(Option<u64>, &'static str, StockPosition); 3] {
    let position = |account_id: Option<u64>, symbol: &str, bought: &str, sold: &str, shares| {
        StockPosition {
            account_id: account_id.unwrap_or_default(),
            symbol: symbol.to_string(),
            purchase_date: bought.to_string(),
            sale_date: sold.to_string(),
            number_of_shares: shares,
        }
    };
    [
        (
            accounts.first,
            "account 1",
            position(accounts.first, "MSFT", "2018-02-20", "2019-02-20", 100),
        ),
        (
            accounts.second,
            "account 2",
            position(accounts.second, "AAPL", "2016-10-19", "2016-10-27", 50),
        ),
        (
            accounts.second,
            "account 2",
            position(accounts.second, "IBM", "2016-09-08", "2016-09-14", 2),
        ),
    ]
}

/// Skip `label` unless the account exists
fn require(
    runner: &mut ScenarioRunner<'_>,
    account: Option<u64>,
    which: &str,
    label: &str,
) -> Option<u64> {
    if account.is_none() {
        runner.skip(label, &format!("{which} was not created"));
    }
    account
}

async fn create_account(runner: &mut ScenarioRunner<'_>, name: &str) -> Option<u64> {
    let request = NewAccount {
        name: name.to_string(),
    };
    let call = EndpointCall::post("/api/v3/accounts", encode(&request))
        .schema(ResponseSchema::AccountCreation)
        .expect([201]);
    let created: AccountCreated = runner.fetch(call).await?;
    Some(created.account_id)
}

/// A freshly created account echoes its id and holds nothing
async fn check_new_account(runner: &mut ScenarioRunner<'_>, account_id: u64, name: &str) {
    let path = format!("/api/v3/accounts/{account_id}");
    let call = EndpointCall::get(&path).schema(ResponseSchema::AccountHoldings);
    let Some(holdings) = runner.fetch::<AccountHoldings>(call).await else {
        return;
    };

    let ok = holdings.account_id == account_id
        && holdings.name == name
        && holdings.stock_holdings.is_empty();
    runner.check(
        &format!("New account (ID: {account_id})"),
        ok,
        format!(
            "id {}, name {:?}, {} holdings",
            holdings.account_id,
            holdings.name,
            holdings.stock_holdings.len()
        ),
    );
}

async fn run_v3(runner: &mut ScenarioRunner<'_>) {
    const FIRST_NAME: &str = "Test Account 1";
    const SECOND_NAME: &str = "Test Account 2";

    runner.section("Testing first account creation");
    let first = create_account(runner, FIRST_NAME).await;
    if let Some(id) = first {
        check_new_account(runner, id, FIRST_NAME).await;
    }

    runner.section("Testing second account creation");
    let second = create_account(runner, SECOND_NAME).await;
    if let Some(id) = second {
        check_new_account(runner, id, SECOND_NAME).await;
    }

    let accounts = CreatedAccounts { first, second };
    runner.context_mut().accounts = accounts;
    let positions = v3_positions(accounts);

    runner.section("Testing adding stocks to accounts");
    for (account, which, position) in &positions {
        let label = format!("POST /api/v3/stocks ({})", position.symbol);
        if require(runner, *account, which, &label).is_some() {
            let call = EndpointCall::post("/api/v3/stocks", encode(position)).expect([201]);
            runner.test_endpoint(call).await;
        }
    }

    runner.section("Testing account holdings retrieval");
    for (account, which) in [(first, "account 1"), (second, "account 2")] {
        get_holdings(runner, account, which).await;
    }

    runner.section("Running Perfect Tests on Accounts");
    check_account_returns(runner, accounts).await;

    runner.section("Testing stocks retrieval across accounts");
    for symbol in ["MSFT", "AAPL", "IBM"] {
        runner
            .test_endpoint(
                EndpointCall::get(format!("/api/v3/stocks/{symbol}"))
                    .schema(ResponseSchema::StockList),
            )
            .await;
    }

    runner.section("Testing returns calculation schema");
    for (account, which) in [(first, "account 1"), (second, "account 2")] {
        let label = format!("GET /api/v3/accounts/return ({which})");
        if let Some(id) = require(runner, account, which, &label) {
            runner
                .test_endpoint(
                    EndpointCall::get(format!("/api/v3/accounts/return/{id}"))
                        .schema(ResponseSchema::AccountReturn),
                )
                .await;
        }
    }

    runner.section("Testing accounts list retrieval");
    runner
        .test_endpoint(EndpointCall::get("/api/v3/accounts").schema(ResponseSchema::AccountsList))
        .await;

    if runner.context().defer_teardown {
        debug!("Keeping v3 holdings and accounts for the account-returns suite");
    } else {
        teardown(runner, accounts).await;
    }
}

/// Stock deletion and account deletion, the steps that change v3's returns
async fn teardown(runner: &mut ScenarioRunner<'_>, accounts: CreatedAccounts) {
    runner.section("Testing stock deletion");
    let positions = v3_positions(accounts);
    let (ibm_account, which, ibm) = &positions[2];
    if require(runner, *ibm_account, which, "DELETE /api/v3/stocks (IBM)").is_some() {
        runner
            .test_endpoint(EndpointCall::delete("/api/v3/stocks", encode(ibm)).expect([204]))
            .await;
    }

    runner.section("Verifying account holdings after stock deletion");
    get_holdings(runner, accounts.second, "account 2").await;

    runner.section("Testing account deletion");
    for (account, which) in [(accounts.first, "account 1"), (accounts.second, "account 2")] {
        let label = format!("DELETE /api/v3/accounts ({which})");
        if let Some(account_id) = require(runner, account, which, &label) {
            runner
                .test_endpoint(
                    EndpointCall::delete("/api/v3/accounts", encode(&AccountRef { account_id }))
                        .expect([204]),
                )
                .await;
        }
    }
}

async fn get_holdings(runner: &mut ScenarioRunner<'_>, account: Option<u64>, which: &str) {
    let label = format!("GET /api/v3/accounts ({which})");
    if let Some(id) = require(runner, account, which, &label) {
        runner
            .test_endpoint(
                EndpointCall::get(format!("/api/v3/accounts/{id}"))
                    .schema(ResponseSchema::AccountHoldings),
            )
            .await;
    }
}

/// Returns of the v3 accounts against their expected values
async fn run_account_returns(runner: &mut ScenarioRunner<'_>) {
    runner.section("Running Perfect Tests on Accounts");

    let accounts = runner.context().accounts;
    if accounts.is_empty() {
        runner.abort("No account IDs available. Run v3 tests first.");
        return;
    }
    check_account_returns(runner, accounts).await;

    if runner.context().defer_teardown {
        teardown(runner, accounts).await;
        *runner.context_mut() = RunContext::default();
    }
}

async fn check_account_returns(runner: &mut ScenarioRunner<'_>, accounts: CreatedAccounts) {
    let expectations = runner.expectations().clone();
    let cases = [
        (accounts.first, "First account", "account 1", expectations.first_account_return),
        (accounts.second, "Second account", "account 2", expectations.second_account_return),
    ];

    for (account, title, which, expected) in cases {
        let label = format!("{title} return");
        let Some(id) = require(runner, account, which, &label) else {
            continue;
        };
        let call = EndpointCall::get(format!("/api/v3/accounts/return/{id}"))
            .schema(ResponseSchema::AccountReturn);
        if let Some(result) = runner.fetch::<AccountReturn>(call).await {
            let label = format!("{title} (ID: {id}) return");
            runner.check_tolerance(&label, result.value, &[expected]);
        }
    }
}

async fn run_v4(runner: &mut ScenarioRunner<'_>) {
    let valid = BacktestRequest::open_below_close(BACKTEST_DATE, BACKTEST_DATE);
    runner
        .test_endpoint(
            EndpointCall::post("/api/v4/back_test", encode(&valid))
                .schema(ResponseSchema::BacktestResponse)
                .expect([200]),
        )
        .await;

    runner.section("Testing non-trading day");
    let non_trading = BacktestRequest::open_below_close("1990-01-01", "1990-01-02");
    let call = EndpointCall::post("/api/v4/back_test", encode(&non_trading)).expect([400]);
    runner.test_endpoint(call).await;
}

async fn run_backtest_exact(runner: &mut ScenarioRunner<'_>) {
    runner.section("Testing exact backtest values");

    let request = BacktestRequest::open_below_close(BACKTEST_DATE, BACKTEST_DATE);
    let call = EndpointCall::post("/api/v4/back_test", encode(&request))
        .schema(ResponseSchema::BacktestResponse)
        .expect([200]);

    let Some(result) = runner.fetch::<BacktestResult>(call).await else {
        runner.check(
            "Backtest value verification",
            false,
            "failed: No response received".to_string(),
        );
        return;
    };

    let expectations = runner.expectations().clone();
    runner.check_exact(
        "Observations",
        result.num_observations,
        expectations.backtest_observations,
    );
    runner.check_tolerance("Return value", result.value, &expectations.backtest_returns);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Expectations;
    use crate::http::{ApiResponse, Method};
    use crate::testing::fake::FakeTransport;
    use crate::testing::{RunReport, ScenarioState, StepOutcome};
    use serde_json::json;

    async fn run_suites(transport: &FakeTransport, suites: &[Suite]) -> RunReport {
        ScenarioRunner::new(transport, Expectations::default())
            .run(suites)
            .await
    }

    fn script_accounts(transport: &FakeTransport) {
        transport.respond_json(Method::Post, "/api/v3/accounts", json!({"account_id": 1}));
        transport.respond_json(Method::Post, "/api/v3/accounts", json!({"account_id": 2}));
        transport.respond_json(
            Method::Get,
            "/api/v3/accounts/1",
            json!({"account_id": 1, "name": "Test Account 1", "stock_holdings": []}),
        );
        transport.respond_json(
            Method::Get,
            "/api/v3/accounts/2",
            json!({"account_id": 2, "name": "Test Account 2", "stock_holdings": []}),
        );
        transport.respond(Method::Post, "/api/v3/stocks", ApiResponse::status_only(201));
        transport.respond_json(
            Method::Get,
            "/api/v3/accounts/return/1",
            json!({"account_id": 1, "return": 1568.0000000000007}),
        );
        transport.respond_json(
            Method::Get,
            "/api/v3/accounts/return/2",
            json!({"account_id": 2, "return": -47.62499999999995}),
        );
        for symbol in ["MSFT", "AAPL", "IBM"] {
            transport.respond_json(
                Method::Get,
                &format!("/api/v3/stocks/{symbol}"),
                json!({"symbol": symbol, "holdings": []}),
            );
        }
        transport.respond_json(
            Method::Get,
            "/api/v3/accounts",
            json!([{"account_id": 1, "name": "Test Account 1"}]),
        );
        transport.respond(Method::Delete, "/api/v3/stocks", ApiResponse::status_only(204));
        transport.respond(Method::Delete, "/api/v3/accounts", ApiResponse::status_only(204));
    }

    #[tokio::test]
    async fn test_v3_happy_path() {
        let transport = FakeTransport::new();
        script_accounts(&transport);

        let report = run_suites(&transport, &[Suite::V3]).await;
        let tally = report.tally();
        assert_eq!(tally.failed, 0, "{:#?}", report.steps().collect::<Vec<_>>());
        assert_eq!(tally.skipped, 0);
        assert_eq!(report.scenarios[0].state, ScenarioState::Completed);

        let stocks: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|call| call.method == Method::Post && call.path == "/api/v3/stocks")
            .collect();
        assert_eq!(stocks.len(), 3);
        assert_eq!(stocks[0].body.as_ref().unwrap()["account_id"], 1);
        assert_eq!(stocks[2].body.as_ref().unwrap()["symbol"], "IBM");
        assert_eq!(stocks[2].body.as_ref().unwrap()["account_id"], 2);
        assert_eq!(transport.call_count(Method::Delete, "/api/v3/accounts"), 2);
    }

    #[tokio::test]
    async fn test_failed_account_creation_skips_dependent_calls() {
        let transport = FakeTransport::new();
        transport.respond(Method::Post, "/api/v3/accounts", ApiResponse::status_only(500));

        let report = run_suites(&transport, &[Suite::V3]).await;
        let calls = transport.calls();
        assert!(!calls
            .iter()
            .any(|call| call.path.starts_with("/api/v3/accounts/")));
        assert_eq!(transport.call_count(Method::Post, "/api/v3/stocks"), 0);
        assert_eq!(transport.call_count(Method::Delete, "/api/v3/accounts"), 0);

        // Both creations plus the independent stock and list lookups
        let tally = report.tally();
        assert_eq!(tally.failed, 6);
        assert!(tally.skipped > 0);
        assert_eq!(report.scenarios[0].state, ScenarioState::Completed);
        assert!(report
            .steps()
            .filter(|step| step.outcome == StepOutcome::Skipped)
            .all(|step| step.detail.ends_with("was not created")));
    }

    #[tokio::test]
    async fn test_account_returns_without_v3_aborts() {
        let transport = FakeTransport::new();

        let report = run_suites(&transport, &[Suite::AccountReturns]).await;
        assert!(transport.calls().is_empty());
        assert_eq!(
            report.scenarios[0].state,
            ScenarioState::Aborted {
                reason: "No account IDs available. Run v3 tests first.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_account_returns_uses_v3_accounts() {
        let transport = FakeTransport::new();
        script_accounts(&transport);
        transport.respond_json(
            Method::Get,
            "/api/v3/accounts/return/2",
            json!({"account_id": 2, "return": -40.0}),
        );

        let report = run_suites(&transport, &[Suite::V3, Suite::AccountReturns]).await;
        let returns = &report.scenarios[1];
        assert_eq!(returns.state, ScenarioState::Completed);
        let failed: Vec<_> = returns
            .steps
            .iter()
            .filter(|step| step.outcome == StepOutcome::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].label, "Second account (ID: 2) return");
        assert!(failed[0].detail.contains("got -40"));
    }

    #[tokio::test]
    async fn test_v3_teardown_waits_for_account_returns() {
        let transport = FakeTransport::new();
        script_accounts(&transport);

        let report = run_suites(&transport, &[Suite::V3, Suite::AccountReturns]).await;
        assert_eq!(report.tally().failed, 0);
        assert!(!report.scenarios[0]
            .steps
            .iter()
            .any(|step| step.label.starts_with("DELETE")));
        assert_eq!(report.scenarios[1].state, ScenarioState::Completed);

        let calls = transport.calls();
        let last_return = calls
            .iter()
            .rposition(|call| call.path.starts_with("/api/v3/accounts/return/"))
            .unwrap();
        let deletions: Vec<_> = calls
            .iter()
            .enumerate()
            .filter(|(_, call)| call.method == Method::Delete && call.path == "/api/v3/accounts")
            .map(|(index, _)| index)
            .collect();
        assert_eq!(deletions.len(), 2);
        assert!(deletions.iter().all(|index| *index > last_return));
        let stock_deletion = calls
            .iter()
            .position(|call| call.method == Method::Delete && call.path == "/api/v3/stocks")
            .unwrap();
        assert!(stock_deletion > last_return);
    }

    #[tokio::test]
    async fn test_invalid_key_probe_uses_bad_key() {
        let transport = FakeTransport::new();
        transport.respond(Method::Get, "/api/v2/2019", ApiResponse::status_only(401));

        let report = run_suites(&transport, &[Suite::InvalidKey]).await;
        assert_eq!(report.tally().passed, 1);
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].api_key.as_deref(), Some(INVALID_API_KEY));
    }

    #[tokio::test]
    async fn test_v2_negative_paths() {
        let transport = FakeTransport::new();

        let report = run_suites(&transport, &[Suite::V2]).await;
        // Unscripted routes answer 404: the probe and valid lookups fail,
        // every negative path passes.
        let tally = report.tally();
        assert_eq!(tally.passed, INVALID_YEARS.len() + INVALID_PRICE_CASES.len());
        assert_eq!(tally.failed, 1 + VALID_YEARS.len() + VALID_PRICE_CASES.len());
        assert_eq!(transport.call_count(Method::Get, "/api/v2/high/XYZ"), 1);
    }

    #[tokio::test]
    async fn test_backtest_exact_accepts_alternate_value() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::Post,
            "/api/v4/back_test",
            ApiResponse::with_body(200, json!({"return": 2059.37, "num_observations": 2033})),
        );

        let report = run_suites(&transport, &[Suite::BacktestExact]).await;
        let tally = report.tally();
        assert_eq!(tally.passed, 3);
        assert_eq!(tally.failed, 0);

        let calls = transport.calls();
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["start_date"], "2020-01-03");
        assert_eq!(body["operator"], "LT");
    }

    #[tokio::test]
    async fn test_backtest_exact_without_response() {
        let transport = FakeTransport::new();
        transport.respond(Method::Post, "/api/v4/back_test", ApiResponse::status_only(500));

        let report = run_suites(&transport, &[Suite::BacktestExact]).await;
        let last = report.steps().last().unwrap();
        assert_eq!(last.label, "Backtest value verification");
        assert_eq!(last.outcome, StepOutcome::Failed);
        assert_eq!(last.detail, "failed: No response received");
    }

    #[tokio::test]
    async fn test_v4_non_trading_day() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::Post,
            "/api/v4/back_test",
            ApiResponse::with_body(200, json!({"return": 2188.4675, "num_observations": 2033})),
        );

        let report = run_suites(&transport, &[Suite::V4]).await;
        // The fake answers both requests alike; the 1990 backtest expects 400
        let steps: Vec<_> = report.steps().collect();
        assert_eq!(steps[0].outcome, StepOutcome::Passed);
        assert_eq!(steps[1].outcome, StepOutcome::Failed);
        assert_eq!(steps[1].detail, "Unexpected status code 200");
    }
}
