use super::types::{Inputs, Projection, RateBracket, YearRecord};

/// Looks up the contribution rate for `age`. Brackets are checked in table
/// order and the first match wins, so insertion order decides ties for
/// overlapping tables. Ages outside every bracket fall back to the first
/// (lowest) bracket's rate; that is a policy default, not an error.
pub fn resolve_rate(age: u32, table: &[RateBracket]) -> f64 {
    let fallback = table.first().map_or(0.0, |bracket| bracket.rate);
    table
        .iter()
        .find(|bracket| bracket.contains(age))
        .map_or(fallback, |bracket| bracket.rate)
}

/// Contribution-eligible annual salary: gross annualized salary minus the
/// coordination deduction, floored at zero. The deduction may exceed a low
/// salary, in which case nothing is insured that year.
pub fn insured_salary(monthly_salary: f64, months_per_year: u32, coordination_deduction: f64) -> f64 {
    (monthly_salary * months_per_year as f64 - coordination_deduction).max(0.0)
}

fn validate_inputs(inputs: &Inputs) -> Result<(), String> {
    if inputs.current_age >= inputs.retirement_age {
        return Err("retirement_age must be greater than current_age".to_string());
    }

    if !inputs.monthly_salary.is_finite() || inputs.monthly_salary <= 0.0 {
        return Err("monthly_salary must be > 0".to_string());
    }

    if !inputs.salary_growth_rate.is_finite() || inputs.salary_growth_rate <= -1.0 {
        return Err("salary_growth_rate must be a fraction > -1".to_string());
    }

    if inputs.months_per_year == 0 {
        return Err("months_per_year must be > 0".to_string());
    }

    if !inputs.coordination_deduction.is_finite() || inputs.coordination_deduction < 0.0 {
        return Err("coordination_deduction must be >= 0".to_string());
    }

    if inputs.rate_table.is_empty() {
        return Err("rate_table must contain at least one bracket".to_string());
    }

    for bracket in &inputs.rate_table {
        if bracket.start > bracket.end {
            return Err(format!(
                "bracket {}-{} has start above end",
                bracket.start, bracket.end
            ));
        }
        if !bracket.rate.is_finite() || bracket.rate <= 0.0 || bracket.rate >= 1.0 {
            return Err(format!(
                "bracket {}-{} rate must be a fraction in (0, 1)",
                bracket.start, bracket.end
            ));
        }
    }

    if inputs.scenario_rates.is_empty() {
        return Err("scenario_rates must contain at least one rate".to_string());
    }

    for rate in &inputs.scenario_rates {
        if !rate.is_finite() || *rate <= -1.0 {
            return Err("scenario rates must be fractions > -1".to_string());
        }
    }

    Ok(())
}

/// Runs the year-by-year projection from `current_age` to `retirement_age`
/// (exclusive), tracking one balance per scenario rate.
///
/// Each year the contribution is computed from the pre-growth salary, added
/// to every scenario balance, and the whole balance then grows by that
/// scenario's rate. The year's contribution therefore earns a full year of
/// return; salary growth applies only to the following year. The returned
/// records keep full floating-point precision; rounding is the caller's
/// concern.
pub fn run_projection(inputs: &Inputs) -> Result<Projection, String> {
    validate_inputs(inputs)?;

    let year_count = (inputs.retirement_age - inputs.current_age) as usize;
    let mut years = Vec::with_capacity(year_count);
    let mut balances = vec![0.0_f64; inputs.scenario_rates.len()];
    let mut salary = inputs.monthly_salary;

    for age in inputs.current_age..inputs.retirement_age {
        let insured = insured_salary(salary, inputs.months_per_year, inputs.coordination_deduction);
        let contribution_rate = resolve_rate(age, &inputs.rate_table);
        let annual_contribution = insured * contribution_rate;

        for (balance, rate) in balances.iter_mut().zip(&inputs.scenario_rates) {
            *balance = (*balance + annual_contribution) * (1.0 + rate);
        }

        years.push(YearRecord {
            age,
            monthly_salary: salary,
            insured_salary: insured,
            contribution_rate,
            annual_contribution,
            balances: balances.clone(),
        });

        salary *= 1.0 + inputs.salary_growth_rate;
    }

    Ok(Projection {
        scenario_rates: inputs.scenario_rates.clone(),
        years,
    })
}
