use serde::Serialize;

use super::engine::{projected_sale_price, simulate};
use super::tax::{BracketTable, progressive_tax};
use super::types::{AmortizationCheckpoint, EvaluationInputs};

/// Rental assumptions; rates are fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RentalInputs {
    pub monthly_rent: f64,
    pub occupancy_rate: f64,
    pub annual_operating_costs: f64,
    pub rent_growth_rate: f64,
    pub rental_income_tax_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentVsSellYear {
    pub year_index: u32,
    pub gross_rent: f64,
    pub net_operating_income: f64,
    pub rental_income_tax: f64,
    pub debt_service: f64,
    pub net_rental_cash_flow: f64,
    pub cumulative_net_rent: f64,
    pub sale_price: f64,
    pub capital_gains_tax: f64,
    pub net_cash_if_sold: f64,
    pub rent_then_sell_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentVsSellComparison {
    pub acquisition_basis: f64,
    pub sell_now_price: f64,
    pub sell_now_capital_gains_tax: f64,
    pub sell_now_net_cash: f64,
    pub years: Vec<RentVsSellYear>,
    pub break_even_year: Option<u32>,
}

fn acquisition_basis(inputs: &EvaluationInputs) -> f64 {
    let purchase_tax_percent = inputs.purchase_tax.rate_for_year(0).percent();
    inputs.purchase_price
        + inputs.purchase_price * purchase_tax_percent / 100.0
        + inputs.improvements_cost
        + inputs.broker_fee
}

struct SaleOutcome {
    capital_gains_tax: f64,
    net_cash: f64,
}

fn sell_at(
    price: f64,
    basis: f64,
    checkpoint: AmortizationCheckpoint,
    brackets: &BracketTable,
) -> SaleOutcome {
    let capital_gains_tax = progressive_tax(price - basis, brackets);
    SaleOutcome {
        capital_gains_tax,
        net_cash: price - checkpoint.remaining_principal - capital_gains_tax,
    }
}

/// Compares selling today against renting for `horizon_years` and selling
/// afterwards. Gains are taxed on the progressive `brackets`.
pub fn compare_rent_vs_sell(
    inputs: &EvaluationInputs,
    rental: &RentalInputs,
    brackets: &BracketTable,
    horizon_years: u32,
) -> RentVsSellComparison {
    let basis = acquisition_basis(inputs);

    let sell_now_price = inputs.base_market_value();
    let sell_now = sell_at(sell_now_price, basis, simulate(&inputs.loan, 0), brackets);

    let mut years = Vec::with_capacity(horizon_years as usize);
    let mut previous = simulate(&inputs.loan, 0);
    let mut cumulative_net_rent = 0.0;
    let mut break_even_year = None;

    for year in 1..=horizon_years {
        let checkpoint = simulate(&inputs.loan, year.saturating_mul(12));
        let interest_paid = checkpoint.cumulative_interest_paid - previous.cumulative_interest_paid;
        let principal_repaid = previous.remaining_principal - checkpoint.remaining_principal;
        let debt_service = interest_paid + principal_repaid;

        let gross_rent = rental.monthly_rent
            * 12.0
            * rental.occupancy_rate.clamp(0.0, 1.0)
            * (1.0 + rental.rent_growth_rate).powf(f64::from(year - 1));
        let net_operating_income = gross_rent - rental.annual_operating_costs;
        let rental_income_tax = net_operating_income.max(0.0) * rental.rental_income_tax_rate;
        let net_rental_cash_flow = net_operating_income - rental_income_tax - debt_service;
        cumulative_net_rent += net_rental_cash_flow;

        let sale_price = projected_sale_price(inputs, year);
        let sale = sell_at(sale_price, basis, checkpoint, brackets);
        let rent_then_sell_total = cumulative_net_rent + sale.net_cash;

        if break_even_year.is_none() && rent_then_sell_total > sell_now.net_cash {
            break_even_year = Some(year);
        }

        years.push(RentVsSellYear {
            year_index: year,
            gross_rent,
            net_operating_income,
            rental_income_tax,
            debt_service,
            net_rental_cash_flow,
            cumulative_net_rent,
            sale_price,
            capital_gains_tax: sale.capital_gains_tax,
            net_cash_if_sold: sale.net_cash,
            rent_then_sell_total,
        });
        previous = checkpoint;
    }

    RentVsSellComparison {
        acquisition_basis: basis,
        sell_now_price,
        sell_now_capital_gains_tax: sell_now.capital_gains_tax,
        sell_now_net_cash: sell_now.net_cash,
        years,
        break_even_year,
    }
}
