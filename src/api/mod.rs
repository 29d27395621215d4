use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{Inputs, Projection, RateBracket, YearRecord, run_projection};

/// BVG total contribution rates by age bracket, percent of insured salary.
fn default_rate_table() -> Vec<RateBracket> {
    vec![
        RateBracket::new(25, 34, 0.07),
        RateBracket::new(35, 44, 0.10),
        RateBracket::new(45, 54, 0.15),
        RateBracket::new(55, 65, 0.18),
    ]
}

#[derive(Parser, Debug)]
#[command(
    name = "bvg",
    about = "BVG occupational pension projector (age-banded contributions, multi-scenario compounding)"
)]
struct Cli {
    #[arg(long, default_value_t = 25)]
    current_age: u32,
    #[arg(long, default_value_t = 61, help = "First non-simulated age")]
    retirement_age: u32,
    #[arg(long, default_value_t = 5000.0, help = "Gross monthly salary at the start")]
    monthly_salary: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Annual salary growth in percent, applied after each simulated year"
    )]
    salary_growth_rate: f64,
    #[arg(long, default_value_t = 12)]
    months_per_year: u32,
    #[arg(
        long,
        default_value_t = 25725.0,
        help = "Annual coordination deduction subtracted before insuring the salary"
    )]
    coordination_deduction: f64,
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = vec![1.25, 2.0, 2.5, 3.0, 3.5, 4.0, 6.0],
        help = "Annual return scenarios in percent, one trajectory each"
    )]
    scenario_rates: Vec<f64>,
    #[arg(
        long = "bracket",
        help = "Contribution bracket as START-END:RATE_PERCENT (e.g. 25-34:7), repeatable; \
                replaces the built-in BVG table when given"
    )]
    brackets: Vec<String>,
}

fn parse_bracket(entry: &str) -> Result<RateBracket, String> {
    let invalid = || format!("invalid --bracket '{entry}', expected START-END:RATE_PERCENT");

    let (range, rate) = entry.split_once(':').ok_or_else(invalid)?;
    let (start, end) = range.split_once('-').ok_or_else(invalid)?;

    let start = start.trim().parse::<u32>().map_err(|_| invalid())?;
    let end = end.trim().parse::<u32>().map_err(|_| invalid())?;
    let rate = rate.trim().parse::<f64>().map_err(|_| invalid())?;

    if start > end {
        return Err(format!("--bracket '{entry}' has start above end"));
    }
    if !rate.is_finite() || rate <= 0.0 || rate >= 100.0 {
        return Err(format!(
            "--bracket '{entry}' rate must be a percent between 0 and 100 exclusive"
        ));
    }

    Ok(RateBracket::new(start, end, rate / 100.0))
}

fn build_inputs(cli: Cli) -> Result<Inputs, String> {
    if cli.retirement_age <= cli.current_age {
        return Err("--retirement-age must be > --current-age".to_string());
    }

    if !cli.monthly_salary.is_finite() || cli.monthly_salary <= 0.0 {
        return Err("--monthly-salary must be > 0".to_string());
    }

    if !cli.salary_growth_rate.is_finite() || cli.salary_growth_rate <= -100.0 {
        return Err("--salary-growth-rate must be > -100".to_string());
    }

    if cli.months_per_year == 0 {
        return Err("--months-per-year must be > 0".to_string());
    }

    if !cli.coordination_deduction.is_finite() || cli.coordination_deduction < 0.0 {
        return Err("--coordination-deduction must be >= 0".to_string());
    }

    if cli.scenario_rates.is_empty() {
        return Err("--scenario-rates must list at least one rate".to_string());
    }

    for rate in &cli.scenario_rates {
        if !rate.is_finite() || *rate <= -100.0 {
            return Err("--scenario-rates entries must be > -100".to_string());
        }
    }

    let rate_table = if cli.brackets.is_empty() {
        default_rate_table()
    } else {
        cli.brackets
            .iter()
            .map(|entry| parse_bracket(entry))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Inputs {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        monthly_salary: cli.monthly_salary,
        salary_growth_rate: cli.salary_growth_rate / 100.0,
        months_per_year: cli.months_per_year,
        coordination_deduction: cli.coordination_deduction,
        rate_table,
        scenario_rates: cli
            .scenario_rates
            .iter()
            .map(|rate| rate / 100.0)
            .collect(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    monthly_salary: Option<f64>,
    salary_growth_rate: Option<f64>,
    months_per_year: Option<u32>,
    coordination_deduction: Option<f64>,
    /// Comma-separated scenario returns in percent, e.g. "1.25,2,4".
    scenario_rates: Option<String>,
    /// Comma-separated bracket entries, e.g. "25-34:7,35-44:10".
    brackets: Option<String>,
}

fn inputs_from_payload(payload: ProjectPayload) -> Result<Inputs, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.monthly_salary {
        cli.monthly_salary = v;
    }
    if let Some(v) = payload.salary_growth_rate {
        cli.salary_growth_rate = v;
    }
    if let Some(v) = payload.months_per_year {
        cli.months_per_year = v;
    }
    if let Some(v) = payload.coordination_deduction {
        cli.coordination_deduction = v;
    }
    if let Some(v) = payload.scenario_rates {
        cli.scenario_rates = v
            .split(',')
            .map(|entry| {
                entry
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("invalid scenarioRates entry '{}'", entry.trim()))
            })
            .collect::<Result<Vec<_>, _>>()?;
    }
    if let Some(v) = payload.brackets {
        cli.brackets = v.split(',').map(|entry| entry.trim().to_string()).collect();
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 25,
        retirement_age: 61,
        monthly_salary: 5_000.0,
        salary_growth_rate: 2.0,
        months_per_year: 12,
        coordination_deduction: 25_725.0,
        scenario_rates: vec![1.25, 2.0, 2.5, 3.0, 3.5, 4.0, 6.0],
        brackets: Vec::new(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioSeries {
    rate: f64,
    balances: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    current_age: u32,
    retirement_age: u32,
    coordination_deduction: f64,
    salary_growth_rate: f64,
    scenario_rates: Vec<f64>,
    salaries: Vec<f64>,
    contributions: Vec<f64>,
    scenarios: Vec<ScenarioSeries>,
    years: Vec<YearRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_project_response(inputs: &Inputs, projection: Projection) -> ProjectResponse {
    let scenarios = projection
        .scenario_rates
        .iter()
        .enumerate()
        .map(|(index, rate)| ScenarioSeries {
            rate: *rate,
            balances: projection.scenario_balances(index).unwrap_or_default(),
        })
        .collect();

    ProjectResponse {
        current_age: inputs.current_age,
        retirement_age: inputs.retirement_age,
        coordination_deduction: inputs.coordination_deduction,
        salary_growth_rate: inputs.salary_growth_rate,
        scenario_rates: projection.scenario_rates.clone(),
        salaries: projection.salaries(),
        contributions: projection.contributions(),
        scenarios,
        years: projection.years,
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("BVG projection API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn index_handler() -> Response {
    json_response(
        StatusCode::OK,
        serde_json::json!({
            "service": "bvg",
            "endpoints": ["/api/project"],
        }),
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match run_projection(&inputs) {
        Ok(projection) => json_response(StatusCode::OK, build_project_response(&inputs, projection)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
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

/// Parses the CLI flags, runs the projection, and prints the year table.
/// Values are rounded here only; the engine output keeps full precision.
pub fn run_projection_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let inputs = build_inputs(cli)?;
    let projection = run_projection(&inputs)?;

    print!("age   salary  insured   rate  contribution");
    for rate in &projection.scenario_rates {
        print!("  {:>9.2}%", rate * 100.0);
    }
    println!();

    for year in &projection.years {
        print!(
            "{:<4} {:>7.0} {:>8.0} {:>5.1}% {:>13.0}",
            year.age,
            year.monthly_salary,
            year.insured_salary,
            year.contribution_rate * 100.0,
            year.annual_contribution,
        );
        for balance in &year.balances {
            print!(" {:>10.0}", balance);
        }
        println!();
    }

    if let Some(last) = projection.years.last() {
        println!();
        println!("Balance at retirement (age {}):", inputs.retirement_age);
        for (rate, balance) in projection.scenario_rates.iter().zip(&last.balances) {
            println!("  {:>5.2}% return: {:>12.0}", rate * 100.0, balance);
        }
    }

    Ok(())
}

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<Inputs, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload)
}
