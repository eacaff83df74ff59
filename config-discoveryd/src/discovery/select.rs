//! RFC 2782 target selection.

use rand::rngs::OsRng;
use rand::{CryptoRng, Rng};
use crate::dns::Srv;
use crate::error::NoCandidates;

/// Picks one SRV record from the lowest priority group, weighted by `weight`.
///
/// Draws come from the operating system's random source so that many clients
/// selecting against the same record set do not converge on one target.
pub fn select(candidates: &[Srv]) -> Result<&Srv, NoCandidates> {
    select_with(&mut OsRng, candidates)
}

/// Same as [`select`] with an explicit random source.
pub fn select_with<'a, R>(rng: &mut R, candidates: &'a [Srv]) -> Result<&'a Srv, NoCandidates>
where
    R: Rng + CryptoRng,
{
    let min_priority = candidates
        .iter()
        .map(|srv| srv.priority)
        .min()
        .ok_or(NoCandidates)?;
    let options: Vec<&Srv> = candidates
        .iter()
        .filter(|srv| srv.priority == min_priority)
        .collect();

    let mut total: u64 = options.iter().map(|srv| u64::from(srv.weight)).sum();
    if total == 0 {
        return Ok(options[rng.gen_range(0..options.len())]);
    }

    let cutoff = rng.gen_range(0..total);
    for option in options.iter().copied() {
        total -= u64::from(option.weight);
        if total <= cutoff {
            return Ok(option);
        }
    }

    // total reaches 0 on the last option, which is always <= cutoff
    Ok(options[options.len() - 1])
}
