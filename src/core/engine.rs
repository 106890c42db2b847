use super::tax::flat_capital_gains_tax;
use super::types::{
    AmortizationCheckpoint, EvaluationInputs, LoanTerms, MonthRow, RatePhase, SaleEvaluation,
    SaleScenario,
};

pub const CAPITAL_GAINS_FLAT_RATE: f64 = 0.10;
pub const EARLY_SALE_PENALTY_RATE: f64 = 0.02;
pub const EARLY_SALE_WINDOW_YEARS: u32 = 3;
pub const DEFAULT_HORIZON_YEARS: u32 = 10;

/// Fixed periodic payment that amortizes `principal` over `periods` at a
/// constant `periodic_rate` (a fraction per period).
pub fn annuity_payment(principal: f64, periodic_rate: f64, periods: u32) -> f64 {
    if principal <= 0.0 || periods == 0 {
        return 0.0;
    }
    let n = periods as f64;
    if periodic_rate == 0.0 {
        return principal / n;
    }
    principal * periodic_rate / (1.0 - (1.0 + periodic_rate).powf(-n))
}

fn is_usable_payment(payment: f64) -> bool {
    payment.is_finite() && payment > 0.0
}

#[derive(Debug, Clone, Copy)]
struct LoanState {
    balance: f64,
    cumulative_interest: f64,
}

impl LoanState {
    fn step(&mut self, month: u32, phase: RatePhase, payment: f64, rate: f64) -> MonthRow {
        let opening = self.balance;
        let interest = opening * rate;
        self.balance = (opening - (payment - interest)).max(0.0);
        self.cumulative_interest += interest;
        let amortization = opening - self.balance;
        MonthRow {
            month: month + 1,
            phase,
            payment: interest + amortization,
            interest,
            amortization,
            balance: self.balance,
            cumulative_interest: self.cumulative_interest,
        }
    }

    fn checkpoint(self) -> AmortizationCheckpoint {
        AmortizationCheckpoint {
            cumulative_interest_paid: self.cumulative_interest,
            remaining_principal: self.balance,
        }
    }
}

fn replay_loan<F>(loan: &LoanTerms, months: u32, mut on_month: F) -> AmortizationCheckpoint
where
    F: FnMut(MonthRow),
{
    let principal = loan.principal_financed;
    if principal <= 0.0 {
        return AmortizationCheckpoint::default();
    }

    let fixed_months = loan.fixed_period_months.min(loan.total_term_months);
    let opening_payment = if fixed_months > 0 {
        annuity_payment(
            principal,
            loan.fixed_rate_monthly_fraction,
            loan.total_term_months,
        )
    } else {
        annuity_payment(
            principal,
            loan.variable_rate_monthly_fraction,
            loan.total_term_months,
        )
    };
    if !is_usable_payment(opening_payment) {
        tracing::debug!(
            principal,
            payment = opening_payment,
            "degenerate loan terms, simulation short-circuited"
        );
        return AmortizationCheckpoint::default();
    }

    let months = months.min(loan.total_term_months);
    let mut state = LoanState {
        balance: principal,
        cumulative_interest: 0.0,
    };

    for month in 0..fixed_months.min(months) {
        if state.balance <= 0.0 {
            break;
        }
        on_month(state.step(
            month,
            RatePhase::Fixed,
            opening_payment,
            loan.fixed_rate_monthly_fraction,
        ));
    }

    if months <= fixed_months || state.balance <= 0.0 {
        return state.checkpoint();
    }

    let variable_payment = if fixed_months == 0 {
        opening_payment
    } else {
        annuity_payment(
            state.balance,
            loan.variable_rate_monthly_fraction,
            loan.variable_period_months(),
        )
    };
    if !is_usable_payment(variable_payment) {
        tracing::debug!(
            balance = state.balance,
            payment = variable_payment,
            "degenerate variable phase, simulation short-circuited"
        );
        return AmortizationCheckpoint::default();
    }

    for month in fixed_months..months {
        if state.balance <= 0.0 {
            break;
        }
        on_month(state.step(
            month,
            RatePhase::Variable,
            variable_payment,
            loan.variable_rate_monthly_fraction,
        ));
    }

    state.checkpoint()
}

pub fn simulate(loan: &LoanTerms, months: u32) -> AmortizationCheckpoint {
    replay_loan(loan, months, |_| {})
}

pub fn amortization_schedule(loan: &LoanTerms, months: u32) -> Vec<MonthRow> {
    let mut rows = Vec::with_capacity(months.min(loan.total_term_months) as usize);
    replay_loan(loan, months, |row| rows.push(row));
    rows
}

pub fn initial_payment(loan: &LoanTerms) -> f64 {
    let rate = if loan.fixed_period_months > 0 {
        loan.fixed_rate_monthly_fraction
    } else {
        loan.variable_rate_monthly_fraction
    };
    annuity_payment(loan.principal_financed, rate, loan.total_term_months)
}

pub fn projected_sale_price(inputs: &EvaluationInputs, year_index: u32) -> f64 {
    inputs.base_market_value() * (1.0 + inputs.annual_appreciation_rate).powf(f64::from(year_index))
}

fn evaluate_at_price(
    inputs: &EvaluationInputs,
    year_index: u32,
    sale_price: f64,
) -> SaleEvaluation {
    let checkpoint = simulate(&inputs.loan, year_index.saturating_mul(12));

    let purchase_tax_percent = inputs.purchase_tax.rate_for_year(year_index).percent();
    let purchase_tax_amount = inputs.purchase_price * purchase_tax_percent / 100.0;

    let taxable_basis = inputs.purchase_price
        + purchase_tax_amount
        + checkpoint.cumulative_interest_paid
        + inputs.improvements_cost
        + inputs.broker_fee;
    let gross_gain = sale_price - taxable_basis;

    let capital_gains_tax = flat_capital_gains_tax(gross_gain, CAPITAL_GAINS_FLAT_RATE);
    let hypothetical_early_sale_tax = if year_index < EARLY_SALE_WINDOW_YEARS {
        sale_price * EARLY_SALE_PENALTY_RATE
    } else {
        0.0
    };

    let net_gain = gross_gain - capital_gains_tax - hypothetical_early_sale_tax;
    let net_cash_at_closing = sale_price
        - checkpoint.remaining_principal
        - capital_gains_tax
        - hypothetical_early_sale_tax;

    let invested_cash = inputs.down_payment
        + inputs.notary_fees
        + purchase_tax_amount
        + inputs.improvements_cost
        + inputs.broker_fee;
    let return_on_investment_percent = if invested_cash > 0.0 {
        net_gain / invested_cash * 100.0
    } else {
        0.0
    };

    SaleEvaluation {
        year_index,
        sale_price,
        purchase_tax_percent,
        purchase_tax_amount,
        cumulative_interest_paid: checkpoint.cumulative_interest_paid,
        remaining_principal: checkpoint.remaining_principal,
        taxable_basis,
        gross_gain,
        capital_gains_tax,
        hypothetical_early_sale_tax,
        net_gain,
        net_cash_at_closing,
        invested_cash,
        return_on_investment_percent,
    }
}

/// Sale outcome for a single year. A manual sale price, when given, replaces
/// the appreciation projection.
pub fn evaluate_sale_year(inputs: &EvaluationInputs, year_index: u32) -> SaleEvaluation {
    let sale_price = inputs
        .manual_sale_price
        .unwrap_or_else(|| projected_sale_price(inputs, year_index));
    evaluate_at_price(inputs, year_index, sale_price)
}

pub fn sale_year_series(inputs: &EvaluationInputs, horizon_years: u32) -> Vec<SaleScenario> {
    (1..=horizon_years)
        .map(|year| {
            let price = projected_sale_price(inputs, year);
            evaluate_at_price(inputs, year, price).into()
        })
        .collect()
}
