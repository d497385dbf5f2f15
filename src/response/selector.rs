use super::Response;
use crate::error::{EngineError, Result};
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Strategy choosing one response among a route's candidates.
///
/// Only active responses (see [`Response::is_active`]) are eligible.
/// [`ResponseSelector::select`] never mutates anything;
/// [`ResponseSelector::claim`] also reserves one use of the pick. The caller
/// counts the hit once the response is actually delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSelector {
    /// Always the first eligible response in list order
    First,
    /// Weighted random draw, probability proportional to `weight`
    #[default]
    Random,
    /// Eligible response with the fewest uses, ties broken by list order
    Balanced,
}

impl ResponseSelector {
    /// Pick a response.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoSuitableResponse`] if no response is eligible, or for
    /// [`ResponseSelector::Random`] when every eligible weight is zero.
    pub fn select<'a, R>(&self, responses: &'a [R]) -> Result<&'a R>
    where
        R: Borrow<Response>,
    {
        let mut eligible = responses.iter().filter(|r| as_response(*r).is_active());
        match self {
            ResponseSelector::First => eligible.next().ok_or(EngineError::NoSuitableResponse),
            ResponseSelector::Balanced => eligible
                .min_by_key(|r| as_response(*r).uses())
                .ok_or(EngineError::NoSuitableResponse),
            ResponseSelector::Random => {
                let candidates: Vec<&R> = eligible.collect();
                let weights = candidates.iter().map(|r| as_response(*r).weight());
                let index = WeightedIndex::new(weights)
                    .map_err(|_| EngineError::NoSuitableResponse)?;
                Ok(candidates[index.sample(&mut rand::thread_rng())])
            }
        }
    }

    /// Pick a response and reserve one use of it.
    ///
    /// A concurrent request can take the last use between selection and
    /// reservation; the pick is then inactive and selection runs again.
    ///
    /// # Errors
    ///
    /// See [`ResponseSelector::select`].
    pub fn claim<'a, R>(&self, responses: &'a [R]) -> Result<&'a R>
    where
        R: Borrow<Response>,
    {
        // every lost race exhausts one response
        for _ in 0..=responses.len() {
            let picked = self.select(responses)?;
            if as_response(picked).try_claim() {
                return Ok(picked);
            }
        }
        Err(EngineError::NoSuitableResponse)
    }

    /// Name used in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSelector::First => "first",
            ResponseSelector::Random => "random",
            ResponseSelector::Balanced => "balanced",
        }
    }
}

fn as_response<R: Borrow<Response>>(r: &R) -> &Response {
    r.borrow()
}

impl fmt::Display for ResponseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
