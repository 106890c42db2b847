mod error;

pub use error::{AppError, InputError};

use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::LazyLock;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::core::{
    AmortizationCheckpoint, DEFAULT_HORIZON_YEARS, EvaluationInputs, LoanTerms, MonthRow,
    PurchaseTaxPolicy, PurchaseTaxRate, ReformInputs, ReformReturn, RentVsSellComparison,
    RentalInputs, SaleEvaluation, SaleScenario, amortization_schedule, compare_rent_vs_sell,
    evaluate_reform, evaluate_sale_year, initial_payment, sale_year_series, savings_brackets,
    simulate,
};

const MAX_HORIZON_YEARS: u32 = 50;
const MAX_TERM_YEARS: u32 = 50;
const MAX_SALE_YEAR: u32 = MAX_HORIZON_YEARS;

#[derive(Parser, Debug)]
#[command(
    name = "homesale",
    about = "Sell-or-hold calculator for a mortgaged home (two-phase amortization, sale taxes, ROI)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long, env = "HOMESALE_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Evaluate one sale year and the year-by-year series
    Evaluate(ScenarioArgs),
    /// Print the month-by-month amortization schedule
    Schedule {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, help = "Months to replay; defaults to the full term")]
        months: Option<u32>,
    },
    /// Compare selling now with renting and selling later
    RentVsSell {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        rental: RentalArgs,
    },
    /// Return on a renovation
    Reform(ReformArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, default_value_t = 130_000.0)]
    purchase_price: f64,
    #[arg(long, default_value_t = 14_500.0)]
    down_payment: f64,
    #[arg(
        long,
        default_value_t = 2_000.0,
        help = "Notary, registry and agency fees paid at purchase"
    )]
    notary_fees: f64,
    #[arg(long, default_value_t = 0.0)]
    improvements_cost: f64,
    #[arg(long, default_value_t = 0.0, help = "Broker fee paid on sale")]
    broker_fee: f64,
    #[arg(long, help = "Current market value, defaults to purchase-price")]
    market_value: Option<f64>,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_negative_numbers = true,
        help = "Annual appreciation in percent"
    )]
    appreciation_rate: f64,
    #[arg(long, default_value_t = 30)]
    term_years: u32,
    #[arg(long, default_value_t = 2.5, help = "Fixed-phase annual rate in percent")]
    fixed_rate: f64,
    #[arg(long, default_value_t = 0, help = "Years at the fixed rate before the loan floats")]
    years_fixed: u32,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_negative_numbers = true,
        help = "Reference index (Euribor) in percent"
    )]
    euribor: f64,
    #[arg(long, default_value_t = 1.0, help = "Bank margin over the index in percent")]
    margin: f64,
    #[arg(
        long,
        help = "Purchase tax in percent (0, 6, 8 or 10); defaults to 10 before year 3, 8 after"
    )]
    purchase_tax_percent: Option<f64>,
    #[arg(long, help = "Manual sale price for the single-year evaluation")]
    sale_price: Option<f64>,
    #[arg(long, default_value_t = 5)]
    sale_year: u32,
    #[arg(long, default_value_t = DEFAULT_HORIZON_YEARS)]
    horizon_years: u32,
}

#[derive(Args, Debug, Clone)]
pub struct RentalArgs {
    #[arg(long, default_value_t = 750.0)]
    monthly_rent: f64,
    #[arg(long, default_value_t = 100.0, help = "Share of the year let, in percent")]
    occupancy_percent: f64,
    #[arg(
        long,
        default_value_t = 1_200.0,
        help = "Yearly community fees, property tax and insurance"
    )]
    operating_costs: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        allow_negative_numbers = true,
        help = "Annual rent growth in percent"
    )]
    rent_growth: f64,
    #[arg(
        long,
        default_value_t = 19.0,
        help = "Tax on positive net rental income in percent"
    )]
    rental_income_tax: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ReformArgs {
    #[arg(long, default_value_t = 0.0)]
    reform_cost: f64,
    #[arg(long, default_value_t = 0.0, help = "Increase in market value after the works")]
    value_uplift: f64,
    #[arg(long, default_value_t = 0.0, help = "Increase in monthly rent after the works")]
    rent_uplift: f64,
}

#[derive(Parser, Debug)]
struct ArgDefaults {
    #[command(flatten)]
    scenario: ScenarioArgs,
    #[command(flatten)]
    rental: RentalArgs,
    #[command(flatten)]
    reform: ReformArgs,
}

static ARG_DEFAULTS: LazyLock<ArgDefaults> =
    LazyLock::new(|| ArgDefaults::parse_from(["homesale"]));

fn arg_defaults() -> &'static ArgDefaults {
    &ARG_DEFAULTS
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioPayload {
    purchase_price: Option<f64>,
    down_payment: Option<f64>,
    notary_fees: Option<f64>,
    #[serde(alias = "improvements")]
    improvements_cost: Option<f64>,
    broker_fee: Option<f64>,
    market_value: Option<f64>,
    #[serde(alias = "appreciation")]
    appreciation_rate: Option<f64>,
    term_years: Option<u32>,
    fixed_rate: Option<f64>,
    years_fixed: Option<u32>,
    #[serde(alias = "indexRate")]
    euribor: Option<f64>,
    margin: Option<f64>,
    purchase_tax_percent: Option<f64>,
    #[serde(alias = "manualSalePrice")]
    sale_price: Option<f64>,
    sale_year: Option<u32>,
    horizon_years: Option<u32>,
    months: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RentVsSellPayload {
    #[serde(flatten)]
    scenario: ScenarioPayload,
    monthly_rent: Option<f64>,
    occupancy_percent: Option<f64>,
    operating_costs: Option<f64>,
    rent_growth: Option<f64>,
    rental_income_tax: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReformPayload {
    #[serde(alias = "cost")]
    reform_cost: Option<f64>,
    value_uplift: Option<f64>,
    rent_uplift: Option<f64>,
}

#[derive(Debug)]
struct ScenarioRequest {
    inputs: EvaluationInputs,
    sale_year: u32,
    horizon_years: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum PolicyLabel {
    Automatic,
    Fixed,
}

impl From<PurchaseTaxPolicy> for PolicyLabel {
    fn from(value: PurchaseTaxPolicy) -> Self {
        match value {
            PurchaseTaxPolicy::Automatic => PolicyLabel::Automatic,
            PurchaseTaxPolicy::Fixed(_) => PolicyLabel::Fixed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateResponse {
    principal_financed: f64,
    initial_monthly_payment: f64,
    purchase_tax_policy: PolicyLabel,
    sale_year: u32,
    horizon_years: u32,
    evaluation: SaleEvaluation,
    series: Vec<SaleScenario>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    principal_financed: f64,
    total_term_months: u32,
    fixed_period_months: u32,
    initial_monthly_payment: f64,
    checkpoint: AmortizationCheckpoint,
    rows: Vec<MonthRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RentVsSellResponse {
    horizon_years: u32,
    #[serde(flatten)]
    comparison: RentVsSellComparison,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn require_amount(flag: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(InputError::InvalidAmount { flag, value })
    }
}

fn require_rate(flag: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() && value > -100.0 {
        Ok(value)
    } else {
        Err(InputError::InvalidRate { flag, value })
    }
}

/// Blank or zero optional prices fall back to their defaults.
fn optional_amount(flag: &'static str, value: Option<f64>) -> Result<Option<f64>, InputError> {
    match value {
        Some(v) => Ok(Some(require_amount(flag, v)?).filter(|v| *v > 0.0)),
        None => Ok(None),
    }
}

fn build_request(args: &ScenarioArgs) -> Result<ScenarioRequest, InputError> {
    let purchase_price = require_amount("--purchase-price", args.purchase_price)?;
    let down_payment = require_amount("--down-payment", args.down_payment)?;
    let notary_fees = require_amount("--notary-fees", args.notary_fees)?;
    let improvements_cost = require_amount("--improvements-cost", args.improvements_cost)?;
    let broker_fee = require_amount("--broker-fee", args.broker_fee)?;
    let market_value = optional_amount("--market-value", args.market_value)?;
    let manual_sale_price = optional_amount("--sale-price", args.sale_price)?;

    let appreciation_rate = require_rate("--appreciation-rate", args.appreciation_rate)?;
    let fixed_rate = require_rate("--fixed-rate", args.fixed_rate)?;
    let euribor = require_rate("--euribor", args.euribor)?;
    let margin = require_rate("--margin", args.margin)?;

    if args.term_years > MAX_TERM_YEARS {
        return Err(InputError::TermTooLong {
            value: args.term_years,
            max: MAX_TERM_YEARS,
        });
    }

    if !(1..=MAX_SALE_YEAR).contains(&args.sale_year) {
        return Err(InputError::SaleYearOutOfRange {
            value: args.sale_year,
            max: MAX_SALE_YEAR,
        });
    }

    if !(1..=MAX_HORIZON_YEARS).contains(&args.horizon_years) {
        return Err(InputError::HorizonOutOfRange {
            value: args.horizon_years,
            max: MAX_HORIZON_YEARS,
        });
    }

    let purchase_tax = match args.purchase_tax_percent {
        None => PurchaseTaxPolicy::Automatic,
        Some(value) => PurchaseTaxRate::from_percent(value)
            .map(PurchaseTaxPolicy::Fixed)
            .ok_or(InputError::UnsupportedPurchaseTax { value })?,
    };

    let loan = LoanTerms::from_annual_terms(
        purchase_price,
        down_payment,
        args.term_years,
        fixed_rate,
        euribor,
        margin,
        args.years_fixed,
    );

    Ok(ScenarioRequest {
        inputs: EvaluationInputs {
            purchase_price,
            down_payment,
            notary_fees,
            improvements_cost,
            broker_fee,
            market_value,
            annual_appreciation_rate: appreciation_rate / 100.0,
            manual_sale_price,
            purchase_tax,
            loan,
        },
        sale_year: args.sale_year,
        horizon_years: args.horizon_years,
    })
}

fn build_rental(args: &RentalArgs) -> Result<RentalInputs, InputError> {
    if !(0.0..=100.0).contains(&args.occupancy_percent) {
        return Err(InputError::OccupancyOutOfRange {
            value: args.occupancy_percent,
        });
    }

    Ok(RentalInputs {
        monthly_rent: require_amount("--monthly-rent", args.monthly_rent)?,
        occupancy_rate: args.occupancy_percent / 100.0,
        annual_operating_costs: require_amount("--operating-costs", args.operating_costs)?,
        rent_growth_rate: require_rate("--rent-growth", args.rent_growth)? / 100.0,
        rental_income_tax_rate: require_amount("--rental-income-tax", args.rental_income_tax)?
            / 100.0,
    })
}

fn build_reform(args: &ReformArgs) -> Result<ReformInputs, InputError> {
    Ok(ReformInputs {
        cost: require_amount("--reform-cost", args.reform_cost)?,
        value_uplift: require_amount("--value-uplift", args.value_uplift)?,
        monthly_rent_uplift: require_amount("--rent-uplift", args.rent_uplift)?,
    })
}

fn apply_scenario_payload(payload: &ScenarioPayload, args: &mut ScenarioArgs) {
    if let Some(v) = payload.purchase_price {
        args.purchase_price = v;
    }
    if let Some(v) = payload.down_payment {
        args.down_payment = v;
    }
    if let Some(v) = payload.notary_fees {
        args.notary_fees = v;
    }
    if let Some(v) = payload.improvements_cost {
        args.improvements_cost = v;
    }
    if let Some(v) = payload.broker_fee {
        args.broker_fee = v;
    }
    if payload.market_value.is_some() {
        args.market_value = payload.market_value;
    }
    if let Some(v) = payload.appreciation_rate {
        args.appreciation_rate = v;
    }
    if let Some(v) = payload.term_years {
        args.term_years = v;
    }
    if let Some(v) = payload.fixed_rate {
        args.fixed_rate = v;
    }
    if let Some(v) = payload.years_fixed {
        args.years_fixed = v;
    }
    if let Some(v) = payload.euribor {
        args.euribor = v;
    }
    if let Some(v) = payload.margin {
        args.margin = v;
    }
    if payload.purchase_tax_percent.is_some() {
        args.purchase_tax_percent = payload.purchase_tax_percent;
    }
    if payload.sale_price.is_some() {
        args.sale_price = payload.sale_price;
    }
    if let Some(v) = payload.sale_year {
        args.sale_year = v;
    }
    if let Some(v) = payload.horizon_years {
        args.horizon_years = v;
    }
}

fn scenario_request_from_payload(payload: &ScenarioPayload) -> Result<ScenarioRequest, InputError> {
    let mut args = arg_defaults().scenario.clone();
    apply_scenario_payload(payload, &mut args);
    build_request(&args)
}

fn rental_from_payload(payload: &RentVsSellPayload) -> Result<RentalInputs, InputError> {
    let mut args = arg_defaults().rental.clone();
    if let Some(v) = payload.monthly_rent {
        args.monthly_rent = v;
    }
    if let Some(v) = payload.occupancy_percent {
        args.occupancy_percent = v;
    }
    if let Some(v) = payload.operating_costs {
        args.operating_costs = v;
    }
    if let Some(v) = payload.rent_growth {
        args.rent_growth = v;
    }
    if let Some(v) = payload.rental_income_tax {
        args.rental_income_tax = v;
    }
    build_rental(&args)
}

fn reform_from_payload(payload: &ReformPayload) -> Result<ReformInputs, InputError> {
    let mut args = arg_defaults().reform.clone();
    if let Some(v) = payload.reform_cost {
        args.reform_cost = v;
    }
    if let Some(v) = payload.value_uplift {
        args.value_uplift = v;
    }
    if let Some(v) = payload.rent_uplift {
        args.rent_uplift = v;
    }
    build_reform(&args)
}

fn evaluate_response(request: &ScenarioRequest) -> EvaluateResponse {
    let inputs = &request.inputs;
    EvaluateResponse {
        principal_financed: inputs.loan.principal_financed,
        initial_monthly_payment: initial_payment(&inputs.loan),
        purchase_tax_policy: inputs.purchase_tax.into(),
        sale_year: request.sale_year,
        horizon_years: request.horizon_years,
        evaluation: evaluate_sale_year(inputs, request.sale_year),
        series: sale_year_series(inputs, request.horizon_years),
    }
}

fn schedule_response(request: &ScenarioRequest, months: Option<u32>) -> ScheduleResponse {
    let loan = &request.inputs.loan;
    let months = months.unwrap_or(loan.total_term_months);
    ScheduleResponse {
        principal_financed: loan.principal_financed,
        total_term_months: loan.total_term_months,
        fixed_period_months: loan.fixed_period_months,
        initial_monthly_payment: initial_payment(loan),
        checkpoint: simulate(loan, months),
        rows: amortization_schedule(loan, months),
    }
}

fn rent_vs_sell_response(request: &ScenarioRequest, rental: &RentalInputs) -> RentVsSellResponse {
    RentVsSellResponse {
        horizon_years: request.horizon_years,
        comparison: compare_rent_vs_sell(
            &request.inputs,
            rental,
            &savings_brackets(),
            request.horizon_years,
        ),
    }
}

/// Runs one CLI command; evaluation commands print JSON to stdout.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Serve { port } => run_http_server(port).await?,
        Command::Evaluate(scenario) => {
            let request = build_request(&scenario)?;
            print_json(&evaluate_response(&request))?;
        }
        Command::Schedule { scenario, months } => {
            let request = build_request(&scenario)?;
            print_json(&schedule_response(&request, months))?;
        }
        Command::RentVsSell { scenario, rental } => {
            let request = build_request(&scenario)?;
            let rental = build_rental(&rental)?;
            print_json(&rent_vs_sell_response(&request, &rental))?;
        }
        Command::Reform(reform) => {
            let inputs = build_reform(&reform)?;
            print_json(&evaluate_reform(&inputs))?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/evaluate",
            get(evaluate_get_handler).post(evaluate_post_handler),
        )
        .route(
            "/api/schedule",
            get(schedule_get_handler).post(schedule_post_handler),
        )
        .route("/api/rent-vs-sell", post(rent_vs_sell_handler))
        .route("/api/reform", post(reform_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "homesale HTTP API listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn evaluate_get_handler(Query(payload): Query<ScenarioPayload>) -> Response {
    evaluate_handler_impl(payload)
}

async fn evaluate_post_handler(Json(payload): Json<ScenarioPayload>) -> Response {
    evaluate_handler_impl(payload)
}

fn evaluate_handler_impl(payload: ScenarioPayload) -> Response {
    match scenario_request_from_payload(&payload) {
        Ok(request) => json_response(StatusCode::OK, evaluate_response(&request)),
        Err(err) => reject("evaluate", &err),
    }
}

async fn schedule_get_handler(Query(payload): Query<ScenarioPayload>) -> Response {
    schedule_handler_impl(payload)
}

async fn schedule_post_handler(Json(payload): Json<ScenarioPayload>) -> Response {
    schedule_handler_impl(payload)
}

fn schedule_handler_impl(payload: ScenarioPayload) -> Response {
    match scenario_request_from_payload(&payload) {
        Ok(request) => json_response(StatusCode::OK, schedule_response(&request, payload.months)),
        Err(err) => reject("schedule", &err),
    }
}

async fn rent_vs_sell_handler(Json(payload): Json<RentVsSellPayload>) -> Response {
    let parsed = scenario_request_from_payload(&payload.scenario)
        .and_then(|request| Ok((request, rental_from_payload(&payload)?)));
    match parsed {
        Ok((request, rental)) => {
            json_response(StatusCode::OK, rent_vs_sell_response(&request, &rental))
        }
        Err(err) => reject("rent-vs-sell", &err),
    }
}

async fn reform_handler(Json(payload): Json<ReformPayload>) -> Response {
    match reform_from_payload(&payload) {
        Ok(inputs) => json_response::<ReformReturn>(StatusCode::OK, evaluate_reform(&inputs)),
        Err(err) => reject("reform", &err),
    }
}

fn reject(endpoint: &'static str, err: &InputError) -> Response {
    tracing::warn!(endpoint, error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ScenarioArgs {
        arg_defaults().scenario.clone()
    }

    fn payload_from_json(json: &str) -> ScenarioPayload {
        serde_json::from_str(json).expect("valid payload")
    }

    async fn send(request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = router().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = serde_json::from_slice(&bytes).expect("json body");
        (status, cache_control, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request")
    }

    fn post_request(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("valid request")
    }

    #[test]
    fn defaults_finance_purchase_minus_down_payment() {
        let request = build_request(&sample_args()).expect("defaults are valid");
        let loan = request.inputs.loan;
        assert_approx(loan.principal_financed, 115_500.0);
        assert_eq!(loan.total_term_months, 360);
        assert_eq!(loan.fixed_period_months, 0);
        assert_approx(loan.variable_rate_monthly_fraction, 0.04 / 12.0);
        assert_approx(request.inputs.annual_appreciation_rate, 0.03);
        assert_eq!(request.inputs.purchase_tax, PurchaseTaxPolicy::Automatic);
        assert_eq!(request.sale_year, 5);
        assert_eq!(request.horizon_years, 10);
    }

    #[test]
    fn build_request_rejects_negative_down_payment() {
        let mut args = sample_args();
        args.down_payment = -1.0;
        let err = build_request(&args).expect_err("must reject negative amount");
        assert!(err.to_string().contains("--down-payment"));
    }

    #[test]
    fn build_request_rejects_non_finite_rate() {
        let mut args = sample_args();
        args.euribor = f64::NAN;
        let err = build_request(&args).expect_err("must reject NaN rate");
        assert!(err.to_string().contains("--euribor"));

        let mut args = sample_args();
        args.appreciation_rate = -100.0;
        assert!(build_request(&args).is_err());
    }

    #[test]
    fn build_request_accepts_negative_index() {
        let mut args = sample_args();
        args.euribor = -0.5;
        let request = build_request(&args).expect("negative Euribor is valid");
        assert_approx(request.inputs.loan.variable_rate_monthly_fraction, 0.5 / 1200.0);
    }

    #[test]
    fn build_request_rejects_unsupported_purchase_tax() {
        let mut args = sample_args();
        args.purchase_tax_percent = Some(7.0);
        assert_eq!(
            build_request(&args).expect_err("7% is not a policy rate"),
            InputError::UnsupportedPurchaseTax { value: 7.0 }
        );

        args.purchase_tax_percent = Some(6.0);
        let request = build_request(&args).expect("6% is a policy rate");
        assert_eq!(
            request.inputs.purchase_tax,
            PurchaseTaxPolicy::Fixed(PurchaseTaxRate::Six)
        );
    }

    #[test]
    fn build_request_rejects_out_of_range_years() {
        let mut args = sample_args();
        args.sale_year = 0;
        assert_eq!(
            build_request(&args).expect_err("year 0 is not a sale"),
            InputError::SaleYearOutOfRange { value: 0, max: 50 }
        );

        let payload = payload_from_json(r#"{"saleYear": 4294967295}"#);
        assert_eq!(
            scenario_request_from_payload(&payload).expect_err("sale year beyond range"),
            InputError::SaleYearOutOfRange {
                value: u32::MAX,
                max: 50
            }
        );
        args.sale_year = 50;
        assert!(build_request(&args).is_ok());

        let mut args = sample_args();
        args.horizon_years = 0;
        assert!(build_request(&args).is_err());
        args.horizon_years = 51;
        let err = build_request(&args).expect_err("horizon too long");
        assert!(err.to_string().contains("--horizon-years"));

        let mut args = sample_args();
        args.term_years = 60;
        assert!(matches!(
            build_request(&args),
            Err(InputError::TermTooLong { value: 60, .. })
        ));
    }

    #[test]
    fn zero_term_is_accepted_and_degrades_to_zero_loan() {
        let mut args = sample_args();
        args.term_years = 0;
        let request = build_request(&args).expect("zero term is degenerate but valid");
        let response = evaluate_response(&request);
        assert_approx(response.initial_monthly_payment, 0.0);
        assert_approx(response.evaluation.remaining_principal, 0.0);
        assert_approx(response.evaluation.cumulative_interest_paid, 0.0);
    }

    #[test]
    fn zero_market_value_and_sale_price_fall_back() {
        let mut args = sample_args();
        args.market_value = Some(0.0);
        args.sale_price = Some(0.0);
        let request = build_request(&args).expect("valid inputs");
        assert_eq!(request.inputs.market_value, None);
        assert_eq!(request.inputs.manual_sale_price, None);
    }

    #[test]
    fn payload_overrides_defaults_and_accepts_aliases() {
        let payload = payload_from_json(
            r#"{
                "purchasePrice": 200000,
                "downPayment": 40000,
                "indexRate": 2.0,
                "margin": 0.8,
                "yearsFixed": 5,
                "purchaseTaxPercent": 8,
                "manualSalePrice": 260000,
                "saleYear": 7,
                "horizonYears": 15
            }"#,
        );
        let request = scenario_request_from_payload(&payload).expect("valid payload");
        let inputs = &request.inputs;
        assert_approx(inputs.loan.principal_financed, 160_000.0);
        assert_eq!(inputs.loan.fixed_period_months, 60);
        assert_approx(inputs.loan.variable_rate_monthly_fraction, 2.8 / 1200.0);
        assert_eq!(
            inputs.purchase_tax,
            PurchaseTaxPolicy::Fixed(PurchaseTaxRate::Eight)
        );
        assert_eq!(inputs.manual_sale_price, Some(260_000.0));
        assert_eq!(request.sale_year, 7);
        assert_eq!(request.horizon_years, 15);
        assert_approx(inputs.notary_fees, 2_000.0);
    }

    #[test]
    fn evaluate_response_serialization_contains_expected_fields() {
        let request = build_request(&sample_args()).expect("valid inputs");
        let json = serde_json::to_string(&evaluate_response(&request)).expect("serializes");
        assert!(json.contains("\"evaluation\""));
        assert!(json.contains("\"series\""));
        assert!(json.contains("\"purchaseTaxPolicy\":\"automatic\""));
        assert!(json.contains("\"initialMonthlyPayment\""));
        assert!(json.contains("\"netCashAtClosing\""));
        assert!(json.contains("\"returnOnInvestmentPercent\""));
        assert!(json.contains("\"hypotheticalEarlySaleTax\""));
    }

    #[test]
    fn rental_and_reform_args_are_validated() {
        let defaults = arg_defaults();
        let rental = build_rental(&defaults.rental).expect("defaults are valid");
        assert_approx(rental.occupancy_rate, 1.0);
        assert_approx(rental.rental_income_tax_rate, 0.19);

        let mut bad_rental = defaults.rental.clone();
        bad_rental.occupancy_percent = 120.0;
        assert!(matches!(
            build_rental(&bad_rental),
            Err(InputError::OccupancyOutOfRange { .. })
        ));

        let mut bad_reform = defaults.reform.clone();
        bad_reform.reform_cost = -10.0;
        let err = build_reform(&bad_reform).expect_err("negative cost");
        assert!(err.to_string().contains("--reform-cost"));
    }

    #[tokio::test]
    async fn get_evaluate_returns_year_and_series() {
        let (status, cache_control, body) =
            send(get_request("/api/evaluate?saleYear=2&horizonYears=12")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_eq!(body["evaluation"]["yearIndex"], 2);
        assert_eq!(body["evaluation"]["purchaseTaxPercent"], 10.0);
        assert_eq!(body["series"].as_array().map(Vec::len), Some(12));
        assert_eq!(body["principalFinanced"], 115_500.0);
    }

    #[tokio::test]
    async fn post_evaluate_rejects_invalid_purchase_tax() {
        let (status, _, body) =
            send(post_request("/api/evaluate", r#"{"purchaseTaxPercent": 7}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().unwrap_or_default();
        assert!(error.contains("--purchase-tax-percent"));
    }

    #[tokio::test]
    async fn schedule_returns_requested_months() {
        let (status, _, body) = send(get_request("/api/schedule?months=12")).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["rows"].as_array().expect("rows array");
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0]["month"], 1);
        assert_eq!(rows[0]["phase"], "variable");
        let remaining = body["checkpoint"]["remainingPrincipal"]
            .as_f64()
            .expect("numeric balance");
        assert!((remaining - 113_466.0).abs() < 0.05);
    }

    #[tokio::test]
    async fn rent_vs_sell_and_reform_endpoints_respond() {
        let (status, _, body) = send(post_request(
            "/api/rent-vs-sell",
            r#"{"monthlyRent": 900, "horizonYears": 4, "marketValue": 160000}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["horizonYears"], 4);
        assert_eq!(body["years"].as_array().map(Vec::len), Some(4));
        assert_eq!(body["sellNowPrice"], 160_000.0);

        let (status, _, body) = send(post_request(
            "/api/reform",
            r#"{"cost": 20000, "valueUplift": 30000, "rentUplift": 150}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["annualRentUplift"], 1_800.0);
        assert_eq!(body["netValueGain"], 10_000.0);
    }

    #[tokio::test]
    async fn health_and_unknown_routes() {
        let (status, _, body) = send(get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, _, body) = send(get_request("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }
}
