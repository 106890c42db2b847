use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReformInputs {
    pub cost: f64,
    pub value_uplift: f64,
    pub monthly_rent_uplift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReformReturn {
    pub net_value_gain: f64,
    pub value_roi_percent: f64,
    pub annual_rent_uplift: f64,
    pub rental_yield_percent: f64,
    pub payback_years: Option<f64>,
}

pub fn evaluate_reform(inputs: &ReformInputs) -> ReformReturn {
    let net_value_gain = inputs.value_uplift - inputs.cost;
    let annual_rent_uplift = inputs.monthly_rent_uplift * 12.0;

    if inputs.cost <= 0.0 {
        return ReformReturn {
            net_value_gain,
            value_roi_percent: 0.0,
            annual_rent_uplift,
            rental_yield_percent: 0.0,
            payback_years: None,
        };
    }

    let payback_years = (annual_rent_uplift > 0.0).then(|| inputs.cost / annual_rent_uplift);

    ReformReturn {
        net_value_gain,
        value_roi_percent: net_value_gain / inputs.cost * 100.0,
        annual_rent_uplift,
        rental_yield_percent: annual_rent_uplift / inputs.cost * 100.0,
        payback_years,
    }
}
