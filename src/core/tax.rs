use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBracket {
    pub upto: f64,
    pub rate: f64,
}

impl TaxBracket {
    pub const fn new(upto: f64, rate: f64) -> Self {
        Self { upto, rate }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TaxTableError {
    #[error("bracket table is empty")]
    Empty,
    #[error("bracket {index} upper bound {upto} is not above the previous bound {previous}")]
    NotAscending {
        index: usize,
        upto: f64,
        previous: f64,
    },
    #[error("bracket {index} rate {rate} is outside [0, 1]")]
    InvalidRate { index: usize, rate: f64 },
    #[error("last bracket must be unbounded, found upper bound {upto}")]
    BoundedTail { upto: f64 },
}

/// Contiguous brackets sorted by upper bound, the last one unbounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, TaxTableError> {
        let Some(last) = brackets.last() else {
            return Err(TaxTableError::Empty);
        };
        if last.upto != f64::INFINITY {
            return Err(TaxTableError::BoundedTail { upto: last.upto });
        }

        let mut previous = 0.0;
        for (index, bracket) in brackets.iter().enumerate() {
            if !(0.0..=1.0).contains(&bracket.rate) {
                return Err(TaxTableError::InvalidRate {
                    index,
                    rate: bracket.rate,
                });
            }
            if bracket.upto.is_nan() || bracket.upto <= previous {
                return Err(TaxTableError::NotAscending {
                    index,
                    upto: bracket.upto,
                    previous,
                });
            }
            previous = bracket.upto;
        }

        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }
}

pub fn savings_brackets() -> BracketTable {
    BracketTable {
        brackets: vec![
            TaxBracket::new(6_000.0, 0.19),
            TaxBracket::new(50_000.0, 0.21),
            TaxBracket::new(200_000.0, 0.23),
            TaxBracket::new(300_000.0, 0.27),
            TaxBracket::new(f64::INFINITY, 0.28),
        ],
    }
}

pub fn progressive_tax(gain: f64, table: &BracketTable) -> f64 {
    if gain.is_nan() || gain <= 0.0 {
        return 0.0;
    }

    let mut tax = 0.0;
    let mut lower = 0.0;
    for bracket in &table.brackets {
        if gain <= lower {
            break;
        }
        let slice = gain.min(bracket.upto) - lower;
        tax += slice * bracket.rate;
        lower = bracket.upto;
    }
    tax
}

pub fn flat_capital_gains_tax(gross_gain: f64, rate: f64) -> f64 {
    if gross_gain > 0.0 {
        gross_gain * rate
    } else {
        0.0
    }
}
