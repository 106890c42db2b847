use serde::Serialize;

/// Financing terms for one evaluation. Rates are monthly fractions, not percents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub principal_financed: f64,
    pub total_term_months: u32,
    pub fixed_rate_monthly_fraction: f64,
    pub variable_rate_monthly_fraction: f64,
    pub fixed_period_months: u32,
}

impl LoanTerms {
    pub fn new(
        principal_financed: f64,
        total_term_months: u32,
        fixed_rate_monthly_fraction: f64,
        variable_rate_monthly_fraction: f64,
        fixed_period_months: u32,
    ) -> Self {
        Self {
            principal_financed: principal_financed.max(0.0),
            total_term_months,
            fixed_rate_monthly_fraction,
            variable_rate_monthly_fraction,
            fixed_period_months: fixed_period_months.min(total_term_months),
        }
    }

    /// Derives monthly terms from the annual figures a borrower quotes:
    /// percents per year, term and fixed period in years.
    pub fn from_annual_terms(
        purchase_price: f64,
        down_payment: f64,
        term_years: u32,
        fixed_annual_percent: f64,
        index_percent: f64,
        margin_percent: f64,
        years_fixed: u32,
    ) -> Self {
        let total_term_months = term_years.saturating_mul(12);
        Self::new(
            purchase_price - down_payment,
            total_term_months,
            fixed_annual_percent / 12.0 / 100.0,
            (index_percent + margin_percent) / 12.0 / 100.0,
            years_fixed.saturating_mul(12),
        )
    }

    pub fn variable_period_months(&self) -> u32 {
        self.total_term_months
            .saturating_sub(self.fixed_period_months)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationCheckpoint {
    pub cumulative_interest_paid: f64,
    pub remaining_principal: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatePhase {
    Fixed,
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRow {
    pub month: u32,
    pub phase: RatePhase,
    pub payment: f64,
    pub interest: f64,
    pub amortization: f64,
    pub balance: f64,
    pub cumulative_interest: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PurchaseTaxRate {
    Exempt,
    Six,
    Eight,
    Ten,
}

impl PurchaseTaxRate {
    pub fn percent(self) -> f64 {
        match self {
            PurchaseTaxRate::Exempt => 0.0,
            PurchaseTaxRate::Six => 6.0,
            PurchaseTaxRate::Eight => 8.0,
            PurchaseTaxRate::Ten => 10.0,
        }
    }

    pub fn from_percent(percent: f64) -> Option<Self> {
        [
            PurchaseTaxRate::Exempt,
            PurchaseTaxRate::Six,
            PurchaseTaxRate::Eight,
            PurchaseTaxRate::Ten,
        ]
        .into_iter()
        .find(|rate| (rate.percent() - percent).abs() < 1e-9)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PurchaseTaxPolicy {
    /// 10% when sold before year 3, 8% afterwards.
    #[default]
    Automatic,
    Fixed(PurchaseTaxRate),
}

impl PurchaseTaxPolicy {
    pub fn rate_for_year(self, year_index: u32) -> PurchaseTaxRate {
        match self {
            PurchaseTaxPolicy::Fixed(rate) => rate,
            PurchaseTaxPolicy::Automatic if year_index < 3 => PurchaseTaxRate::Ten,
            PurchaseTaxPolicy::Automatic => PurchaseTaxRate::Eight,
        }
    }
}

/// Immutable snapshot of everything the sale evaluator reads. Amounts are
/// currency units, `annual_appreciation_rate` is a fraction.
#[derive(Debug, Clone)]
pub struct EvaluationInputs {
    pub purchase_price: f64,
    pub down_payment: f64,
    pub notary_fees: f64,
    pub improvements_cost: f64,
    pub broker_fee: f64,
    pub market_value: Option<f64>,
    pub annual_appreciation_rate: f64,
    pub manual_sale_price: Option<f64>,
    pub purchase_tax: PurchaseTaxPolicy,
    pub loan: LoanTerms,
}

impl EvaluationInputs {
    pub fn base_market_value(&self) -> f64 {
        self.market_value.unwrap_or(self.purchase_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEvaluation {
    pub year_index: u32,
    pub sale_price: f64,
    pub purchase_tax_percent: f64,
    pub purchase_tax_amount: f64,
    pub cumulative_interest_paid: f64,
    pub remaining_principal: f64,
    pub taxable_basis: f64,
    pub gross_gain: f64,
    pub capital_gains_tax: f64,
    pub hypothetical_early_sale_tax: f64,
    pub net_gain: f64,
    pub net_cash_at_closing: f64,
    pub invested_cash: f64,
    pub return_on_investment_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleScenario {
    pub year_index: u32,
    pub projected_sale_price: f64,
    pub net_gain: f64,
    pub net_cash_at_closing: f64,
    pub return_on_investment_percent: f64,
}

impl From<SaleEvaluation> for SaleScenario {
    fn from(value: SaleEvaluation) -> Self {
        Self {
            year_index: value.year_index,
            projected_sale_price: value.sale_price,
            net_gain: value.net_gain,
            net_cash_at_closing: value.net_cash_at_closing,
            return_on_investment_percent: value.return_on_investment_percent,
        }
    }
}
