mod engine;
mod reform;
mod rental;
mod tax;
mod types;

pub use engine::{
    CAPITAL_GAINS_FLAT_RATE, DEFAULT_HORIZON_YEARS, EARLY_SALE_PENALTY_RATE,
    EARLY_SALE_WINDOW_YEARS, amortization_schedule, annuity_payment, evaluate_sale_year,
    initial_payment, projected_sale_price, sale_year_series, simulate,
};
pub use reform::{ReformInputs, ReformReturn, evaluate_reform};
pub use rental::{RentVsSellComparison, RentVsSellYear, RentalInputs, compare_rent_vs_sell};
pub use tax::{
    BracketTable, TaxBracket, TaxTableError, flat_capital_gains_tax, progressive_tax,
    savings_brackets,
};
pub use types::{
    AmortizationCheckpoint, EvaluationInputs, LoanTerms, MonthRow, PurchaseTaxPolicy,
    PurchaseTaxRate, RatePhase, SaleEvaluation, SaleScenario,
};
