use std::collections::HashMap;

use ndarray::{Array1, Array2};

use crate::{LocalUpdate, MlErr, Result};

/// The statistics of the union of every shard for a single round.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalUpdate {
    pub gradient: Array1<f64>,
    pub hessian: Option<Array2<f64>>,
    pub rows: usize,
    pub loss: f64,
}

/// Combines one local update per participant into the global statistics of the round.
///
/// Every local statistic is already a sum over its shard's rows, so the global statistic is the
/// plain sum of the contributions. They are summed in roster order so that a run is reproducible.
///
/// # Arguments
/// * `participants` - The roster, every name must contribute exactly once.
/// * `contributions` - The updates received this round, tagged with their sender.
///
/// # Errors
/// `MlErr::IncompleteRound` if any participant is missing, duplicated or not in the roster, and
/// `MlErr::DimensionMismatch` or `MlErr::Shape` if the contributions don't agree on their shape.
pub fn aggregate<'a, I>(participants: &[String], contributions: I) -> Result<GlobalUpdate>
where
    I: IntoIterator<Item = (&'a str, &'a LocalUpdate)>,
{
    let mut by_party: HashMap<&str, &LocalUpdate> = HashMap::with_capacity(participants.len());
    let mut duplicated = Vec::new();
    let mut unknown = Vec::new();

    for (party, update) in contributions {
        if !participants.iter().any(|p| p == party) {
            unknown.push(party.to_string());
        } else if by_party.insert(party, update).is_some() {
            duplicated.push(party.to_string());
        }
    }

    let missing: Vec<String> = participants
        .iter()
        .filter(|p| !by_party.contains_key(p.as_str()))
        .cloned()
        .collect();

    if !(missing.is_empty() && duplicated.is_empty() && unknown.is_empty()) {
        return Err(MlErr::IncompleteRound {
            missing,
            duplicated,
            unknown,
        });
    }

    let mut ordered = participants.iter().map(|p| by_party[p.as_str()]);
    let Some(first) = ordered.next() else {
        return Err(MlErr::Shape("a round needs at least one participant"));
    };

    let mut global = GlobalUpdate {
        gradient: first.gradient.clone(),
        hessian: first.hessian.clone(),
        rows: first.rows,
        loss: first.loss,
    };

    for update in ordered {
        if update.gradient.len() != global.gradient.len() {
            return Err(MlErr::DimensionMismatch {
                a: "gradient",
                b: "first gradient",
                got: update.gradient.len(),
                expected: global.gradient.len(),
            });
        }

        match (&mut global.hessian, &update.hessian) {
            (Some(sum), Some(hessian)) if sum.dim() == hessian.dim() => *sum += hessian,
            (Some(sum), Some(hessian)) => {
                return Err(MlErr::DimensionMismatch {
                    a: "hessian",
                    b: "first hessian",
                    got: hessian.nrows(),
                    expected: sum.nrows(),
                });
            }
            (None, None) => {}
            _ => return Err(MlErr::Shape("either every contribution has a hessian or none")),
        }

        global.gradient += &update.gradient;
        global.rows += update.rows;
        global.loss += update.loss;
    }

    Ok(global)
}
