use serde::Serialize;

/// One row of the BVG contribution-rate table: an inclusive age range and
/// the total contribution rate (fraction of insured salary) that applies
/// inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBracket {
    pub start: u32,
    pub end: u32,
    pub rate: f64,
}

impl RateBracket {
    pub const fn new(start: u32, end: u32, rate: f64) -> Self {
        Self { start, end, rate }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.start <= age && age <= self.end
    }
}

/// Full projection configuration. Rates are fractions, monetary amounts are
/// in the salary's currency. The bracket table is consulted in vector order;
/// the first entry doubles as the fallback for ages outside every bracket.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub current_age: u32,
    pub retirement_age: u32,
    pub monthly_salary: f64,
    pub salary_growth_rate: f64,
    pub months_per_year: u32,
    pub coordination_deduction: f64,
    pub rate_table: Vec<RateBracket>,
    pub scenario_rates: Vec<f64>,
}

/// Snapshot of one simulated year. `monthly_salary` is the salary at the
/// start of the year, before that year's growth. `balances` is parallel to
/// the configured scenario-rate vector, so duplicate rates keep separate
/// trajectories.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub age: u32,
    pub monthly_salary: f64,
    pub insured_salary: f64,
    pub contribution_rate: f64,
    pub annual_contribution: f64,
    pub balances: Vec<f64>,
}

/// Ordered per-year output of the projection, one record per simulated age.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub scenario_rates: Vec<f64>,
    pub years: Vec<YearRecord>,
}

impl Projection {
    /// Start-of-year monthly salaries, one per simulated age.
    pub fn salaries(&self) -> Vec<f64> {
        self.years.iter().map(|y| y.monthly_salary).collect()
    }

    /// Annual contributions, one per simulated age.
    pub fn contributions(&self) -> Vec<f64> {
        self.years.iter().map(|y| y.annual_contribution).collect()
    }

    /// Year-end balance series for the scenario at `index` in
    /// `scenario_rates`, or `None` when the index is out of range.
    pub fn scenario_balances(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.scenario_rates.len() {
            return None;
        }
        Some(self.years.iter().map(|y| y.balances[index]).collect())
    }
}
