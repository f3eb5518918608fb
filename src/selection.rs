use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{CatalogError, CatalogResult};

#[derive(Parser)]
#[grammar = "selection.pest"]
struct SelectionParser;

/// One side of an interval: a possibly infinite value, inclusive or not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

/// Interval selection for one mask value.
///
/// Written `lo,hi` with both sides exclusive; a trailing `~` makes that
/// side inclusive and `inf`/`-inf` leaves it open. `x~,x~` pins the value
/// exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub lo: Bound,
    pub hi: Bound,
}

impl Selection {
    pub fn contains(&self, x: f64) -> bool {
        let above = if self.lo.inclusive {
            x >= self.lo.value
        } else {
            x > self.lo.value
        };
        let below = if self.hi.inclusive {
            x <= self.hi.value
        } else {
            x < self.hi.value
        };
        above && below
    }
}

/// Parses a `;`-separated list of interval selections, one per mask.
pub fn parse_selections(text: &str) -> CatalogResult<Vec<Selection>> {
    let list = SelectionParser::parse(Rule::selection_list, text)
        .map_err(|e| CatalogError::Selection(e.to_string()))?
        .next()
        .ok_or_else(|| CatalogError::Selection("empty selection".to_owned()))?;

    let mut out = Vec::new();
    for sel in list.into_inner() {
        if sel.as_rule() != Rule::selection {
            continue;
        }
        let mut bounds = sel.into_inner();
        let lo = parse_bound(bounds.next())?;
        let hi = parse_bound(bounds.next())?;
        out.push(Selection { lo, hi });
    }
    Ok(out)
}

fn parse_bound(pair: Option<Pair<Rule>>) -> CatalogResult<Bound> {
    let pair = pair.ok_or_else(|| CatalogError::Selection("missing bound".to_owned()))?;
    let mut inner = pair.into_inner();
    let value_pair = inner
        .next()
        .ok_or_else(|| CatalogError::Selection("missing bound value".to_owned()))?;
    let value = value_pair
        .as_str()
        .parse::<f64>()
        .map_err(|_| CatalogError::Parse {
            what: "selection bound",
            text: value_pair.as_str().to_owned(),
        })?;
    let inclusive = inner.next().is_some();
    Ok(Bound { value, inclusive })
}
